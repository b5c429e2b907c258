//! Texts shown by the proposal sequence.

use serde::{Deserialize, Serialize};

pub const DEFAULT_HEADING: &str = "A Letter From My Heart...";
pub const DEFAULT_QUESTION: &str = "Will you marry me?";
pub const DEFAULT_CELEBRATION: &str = "Our forever starts now!";

const DEFAULT_LETTER: &str = "My love,

Every year on this day I get to celebrate the person who makes me feel safe, \
excited, understood, and endlessly loved.

We are not rushing anything. We have years ahead of us to grow, to chase \
dreams, to stumble and rise, together. And even though the big day may be \
far away, I already know, deep inside, that it is you.

So here it is, my little proposal, wrapped in this letter and in all the love \
I have for you:

Will you keep choosing me, again and again, as the years pass?
Will you hold my hand now, and still be holding it when we finally say yes to forever?

You don't need to answer right away. Just smile and hold me like you always do.

I love you. More than I can say in any letter.

Yours, today, tomorrow, always.
";

/// The letter, the question that follows it and the closing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalScript {
    pub heading: String,
    pub letter: String,
    pub question: String,
    pub celebration: String,
}

impl Default for ProposalScript {
    fn default() -> Self {
        Self {
            heading: DEFAULT_HEADING.to_string(),
            letter: DEFAULT_LETTER.to_string(),
            question: DEFAULT_QUESTION.to_string(),
            celebration: DEFAULT_CELEBRATION.to_string(),
        }
    }
}

impl ProposalScript {
    pub fn with_letter(mut self, letter: impl Into<String>) -> Self {
        self.letter = letter.into();
        self
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = question.into();
        self
    }

    /// Letter length in characters, which drives the reveal timer.
    pub fn letter_chars(&self) -> usize {
        self.letter.chars().count()
    }

    pub fn question_chars(&self) -> usize {
        self.question.chars().count()
    }
}
