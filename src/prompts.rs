//! Prompt templates for the two tutoring call sites

use crate::request::{CodeFeedback, GeneralQuestion, GenerationRequest};

pub const FEEDBACK_PERSONA: &str
  = "You are a senior coding tutor for beginners.";

pub const FEEDBACK_TASK: &str
  = "Give:\n\
     - what's wrong (if anything)\n\
     - a short hint\n\
     - a tiny fix snippet if needed\n\
     - one beginner tip";

pub const QUESTION_TASK: &str
  = "Explain in simple terms and give a tiny example if it helps.";

/// Prompt asking for feedback on submitted code and its diagnostics
pub fn code_feedback_prompt(feedback: &CodeFeedback)
  -> GenerationRequest
{   let mut prompt = String::new();
    prompt.push_str(FEEDBACK_PERSONA);
    prompt.push_str("\n\n");
    prompt.push_str(&format!("Language: {}\n", feedback.language));
    prompt.push_str(&format!("Lesson: {}\n", feedback.lesson_title));
    if !feedback.lesson_description.trim().is_empty()
    {   prompt.push_str(&format!(
          "Lesson description: {}\n"
        , feedback.lesson_description.trim()
        ));
    }
    prompt.push_str(&format!("\nStudent code:\n{}\n", feedback.code));
    prompt.push_str(
      &format!("\nDiagnostics:\n{}\n", feedback.diagnostics)
    );
    prompt.push('\n');
    prompt.push_str(FEEDBACK_TASK);
    GenerationRequest::new(prompt)
}

/// Prompt for a free-form question about a language
pub fn general_question_prompt(question: &GeneralQuestion)
  -> GenerationRequest
{   GenerationRequest::new(format!(
      "A beginner has a question about {}.\n\n\
       Question: {}\n\n\
       {}"
    , question.language
    , question.question
    , QUESTION_TASK
    ))
}
