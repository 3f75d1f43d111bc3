use super::SequenceOptions;
use crate::GeneratorError;

/// Every code from `start` to `stop`, inclusive, in charset order
///
/// The code is treated as an odometer whose rightmost character is the least
/// significant digit. When every digit carries, the charset's first character is
/// prepended and the code grows by one.
///
/// Ordering of `start` and `stop` is not checked. When `stop` cannot be reached by
/// incrementing `start` the sequence does not end.
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    charset: Vec<char>,
    current: Vec<char>,
    stop: Vec<char>,
    started: bool,
    finished: bool,
}

impl SequenceGenerator {
    /// Creates a sequence generator
    ///
    /// # Errors
    ///
    /// * `GeneratorError::EmptyCharset` - the charset has no characters
    /// * `GeneratorError::ForeignCharacter` - `start` or `stop` uses a character
    ///   outside the charset
    pub fn new(options: &SequenceOptions) -> Result<Self, GeneratorError> {
        let charset: Vec<char> = options.charset.chars().collect();
        if charset.is_empty() {
            return Err(GeneratorError::EmptyCharset);
        }

        for code in [&options.start, &options.stop] {
            if let Some(character) = code.chars().find(|c| !charset.contains(c)) {
                return Err(GeneratorError::ForeignCharacter {
                    code: code.clone(),
                    character,
                });
            }
        }

        Ok(Self {
            charset,
            current: options.start.chars().collect(),
            stop: options.stop.chars().collect(),
            started: false,
            finished: false,
        })
    }

    /// Advances `current` to the next code in odometer order
    fn advance(&mut self) {
        let first = self.charset[0];
        let last = self.charset[self.charset.len() - 1];

        for position in (0..self.current.len()).rev() {
            let digit = self.current[position];
            if digit == last {
                self.current[position] = first;
                continue;
            }
            // Validated in `new`, every digit is in the charset
            let index = self.charset.iter().position(|&c| c == digit).unwrap_or(0);
            self.current[position] = self.charset[index + 1];
            return;
        }

        self.current.insert(0, first);
    }
}

impl Iterator for SequenceGenerator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }

        if self.started {
            self.advance();
        } else {
            self.started = true;
        }

        if self.current == self.stop {
            self.finished = true;
        }
        Some(self.current.iter().collect())
    }
}
