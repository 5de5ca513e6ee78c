pub fn multibyte_fixture() -> &'static str {
    return "héllo wörld, 日本語の資料です。Ünïcödé 🚀 done";
}

pub fn docsearch_answer_fixture() -> &'static str {
    return r#"
Assignments are submitted through the course portal before the deadline [syllabus/2024/guide.pdf]. Late work loses ten percent per day [policies.pdf]. Extensions need lecturer approval [syllabus/2024/guide.pdf].

<<How do I request an extension?>>
<<Where is the course portal?>>
"#;
}

pub fn conversation_list_fixture() -> &'static str {
    return r#"{
  "user_id": "u-123",
  "conversations": [
    {
      "conversation_id": "c-1",
      "approach": "chat",
      "title": "Grading rubric",
      "timestamp": "20241002093000"
    },
    {
      "conversation_id": "c-2",
      "approach": "docsearch",
      "title": "Submission deadline",
      "timestamp": "20241001120000"
    },
    {
      "conversation_id": "c-3",
      "approach": "chat",
      "title": "Untimed question",
      "timestamp": null
    },
    {
      "conversation_id": "c-4",
      "approach": "summarize",
      "title": "Unsupported approach",
      "timestamp": "20241002080000"
    }
  ]
}"#;
}

pub fn conversation_content_fixture() -> &'static str {
    return r#"{
  "conversation_id": "c-2",
  "approach": "docsearch",
  "conversations": [
    { "role": "user", "content": "When is the deadline?" },
    { "role": "bot", "content": "Friday at noon [syllabus.pdf]." },
    { "role": "user", "content": "And late work?" },
    { "role": "bot", "content": "Ten percent per day." },
    { "role": "user", "content": "Unanswered follow up" }
  ]
}"#;
}
