/// Position of a send within one logical request.
///
/// There is no successor to `Retry`, so a retried request can never be
/// retried again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retry,
}

impl Attempt {
    pub fn next(self) -> Option<Attempt> {
        match self {
            Attempt::First => Some(Attempt::Retry),
            Attempt::Retry => None,
        }
    }

    pub fn is_retry(self) -> bool {
        self == Attempt::Retry
    }

    pub fn number(self) -> u8 {
        match self {
            Attempt::First => 1,
            Attempt::Retry => 2,
        }
    }
}

/// One concrete send: resolved url plus attempt tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAttempt {
    pub url: String,
    pub attempt: Attempt,
}

impl RequestAttempt {
    pub fn first(url: String) -> Self {
        Self { url, attempt: Attempt::First }
    }

    pub fn retry(self) -> Option<Self> {
        let attempt = self.attempt.next()?;
        Some(Self { url: self.url, attempt })
    }
}
