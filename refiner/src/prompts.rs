//! Prompt templates sent to the chat backend.

/// First answer to the (possibly perturbed) question.
pub fn initial(question: &str) -> String {
    format!(
        "Answer the question below. Do not pay attention to punctuation or accent marks. \
USE BEST PRACTICES. DO NOT OVERCOMPLICATE.

{question}
"
    )
}

/// Ask for critiques of `answer`, one per line.
pub fn thoughts(question: &str, answer: &str) -> String {
    format!(
        "Given the following question:
\"{question}\"

And the following answer:
\"{answer}\"

Think about 2-3 ways to improve the answer.
Record them as separate thoughts below.
REPLY WITH A THOUGHT PER LINE AND NOTHING ELSE. USE BEST PRACTICES."
    )
}

/// Ask for a 1-10 rating of `answer`.
pub fn evaluate(question: &str, answer: &str) -> String {
    format!(
        "Given the following answer:
\"{answer}\"

How well does this thought answer this question:
\"{question}\"

Rate the answer from 1 to 10, where 1 is completely wrong or irrelevant and 10 is a perfect answer.
Reply with a single number between 1 and 10 only. Do not write anything else, it will be discarded."
    )
}

/// Ask for `answer` rewritten to address `improvements`.
pub fn update(question: &str, answer: &str, improvements: &str) -> String {
    format!(
        "For the given question:
{question}

And the answer:
{answer}

Rewrite the answer based on the following suggested improvements:
{improvements}

REPLY WITH UPDATED ANSWER AND NOTHING ELSE. USE BEST PRACTICES."
    )
}
