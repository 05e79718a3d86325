use serde::{Deserialize, Serialize};
use serde_json::json;

pub static DEFAULT_QUESTION_ROLE: &str = "You are presented with a passage of reference content that readers will later search with their own questions.";

pub static DEFAULT_QUESTION_TASK: &str = "Formulate relevant questions that the passage is written to address. Closely follow the example questions for style and structure. Write the questions in the first person with concrete details, at a high school reading level. Every question must be answerable from the passage, but do not copy the passage verbatim. Generate the requested number of questions.";

pub static ANSWERABILITY_SYSTEM_MESSAGE: &str = "Given a list of user questions and a paragraph of content, determine for each question whether the content contains relevant information to infer an answer. Think step by step. First provide an explanation, then generate a 1 or 0 label in the field \"relevant\". Return one verdict per question, in the order the questions were given.";

pub static OUTPUT_REPAIR_SYSTEM_MESSAGE: &str =
    "Below, the Completion did not satisfy the constraints given in the Prompt. Return only the corrected completion.";

const JSON_FORMAT_INSTRUCTIONS: &str = "The output should be a well-formatted JSON instance that conforms to the JSON schema below.\n\nHere is the output JSON schema:\n```\n{schema}\n```\n\nDo not return any preamble or explanations, return only a pure JSON string surrounded by triple backticks (```).";

/// A worked example shown to the model before the actual task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FewShotExample {
    pub context: String,
    pub questions: Vec<String>,
}

/// Role, task and examples used to ask for questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionPrompt {
    pub role: String,
    pub task: String,
    pub examples: Vec<FewShotExample>,
}

impl Default for QuestionPrompt {
    fn default() -> Self {
        Self {
            role: DEFAULT_QUESTION_ROLE.to_string(),
            task: DEFAULT_QUESTION_TASK.to_string(),
            examples: vec![default_example()],
        }
    }
}

impl QuestionPrompt {
    pub fn system_message(&self) -> String {
        format!("{} {}", self.role.trim(), self.task.trim())
    }

    /// Renders the user message: format instructions, examples, then the task.
    pub fn user_message(&self, context: &str, question_count: usize) -> String {
        let mut message = format_instructions(&question_schema());
        message.push('\n');

        if !self.examples.is_empty() {
            message.push_str("\nExamples:\n");
            for example in &self.examples {
                let output = json!({ "questions": example.questions });
                message.push_str(&format!(
                    "\ncontext: {}\nquestions_generated: {}\noutput: ```{}```\n",
                    quote(&example.context),
                    example.questions.len(),
                    output
                ));
            }
        }

        message.push_str("\nYour actual task:\n");
        message.push_str(&format!(
            "\ncontext: {}\nquestions_generated: {question_count}\noutput: \n",
            quote(context)
        ));
        message
    }
}

pub fn answerability_user_message(context: &str, questions: &[String]) -> String {
    format!(
        "{}\n\ncontext: {}\nquestions: {}\noutput: \n",
        format_instructions(&answerability_schema()),
        quote(context),
        json!(questions)
    )
}

pub fn output_repair_user_message(prompt: &str, completion: &str) -> String {
    format!(
        "prompt: {}\ncompletion: {}\nfixed_completion: \n",
        quote(prompt),
        quote(completion)
    )
}

pub fn question_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "questions": {
                "type": "array",
                "description": "list of questions from the context",
                "items": { "type": "string" }
            }
        },
        "required": ["questions"],
        "additionalProperties": false
    })
}

pub fn answerability_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "verdicts": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "question": { "type": "string", "description": "a question generated from the context" },
                        "explanation": { "type": "string", "description": "the reason justifying the label" },
                        "relevant": {
                            "type": "integer",
                            "description": "(0/1) if the content contains relevant information to infer an answer to the question"
                        }
                    },
                    "required": ["question", "explanation", "relevant"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["verdicts"],
        "additionalProperties": false
    })
}

fn format_instructions(schema: &serde_json::Value) -> String {
    JSON_FORMAT_INSTRUCTIONS.replace("{schema}", &schema.to_string())
}

fn quote(text: &str) -> String {
    serde_json::Value::String(text.to_owned()).to_string()
}

fn default_example() -> FewShotExample {
    FewShotExample {
        context: "Abstractive summarization is the task of generating concise summaries that capture the key ideas in a source document. Unlike extractive summarization, which lifts entire sentences from the original text, abstractive summarization involves rephrasing and condensing information to create a newer, shorter version. To evaluate abstractive summaries, Kryscinski et al. (2019) proposed four key dimensions: fluency, coherence, consistency, and relevance.".to_string(),
        questions: vec![
            "What is the main difference between abstractive and extractive summarization?".to_string(),
            "How does abstractive summarization condense information from a source document?".to_string(),
            "What are the four key dimensions proposed by Kryscinski et al. (2019) for evaluating abstractive summaries?".to_string(),
        ],
    }
}
