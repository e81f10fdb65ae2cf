//! Interactive prompts.
//!
//! Unique responsibility: ask the user for a value and return it already
//! checked by the caller's validator.
//!
//! The resolver only sees the [`Prompter`] trait. [`TerminalPrompter`] is the
//! line-based implementation used by the binary; it writes questions to stderr
//! so `--output json` stays machine readable.

use std::io::{self, BufRead, Write};

/// Validator applied to typed text before it is accepted.
pub type Validator<'a> = &'a dyn Fn(&str) -> Result<(), String>;

/// Prompt failure.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Input ended before an answer was given.
    #[error("input closed before an answer was given")]
    Closed,
    /// Reading or writing the terminal failed.
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
    /// The answer was rejected and no retry is possible.
    #[error("{0}")]
    Invalid(String),
}

/// Question shown to the user.
#[derive(Debug, Clone, Copy)]
pub struct Question<'a> {
    /// Short question text, e.g. `Machine pool name`.
    pub text: &'a str,
    /// Longer help shown on `?`.
    pub help: &'a str,
}

impl<'a> Question<'a> {
    /// New question.
    #[must_use]
    pub const fn new(text: &'a str, help: &'a str) -> Self {
        Self { text, help }
    }
}

/// Source of interactive answers.
pub trait Prompter {
    /// Ask for free text. An empty answer takes `default`.
    ///
    /// # Errors
    ///
    /// Closed input, I/O failure, or an answer the prompter cannot re-ask for.
    fn input_string(
        &mut self,
        question: &Question<'_>,
        default: &str,
        required: bool,
        validator: Option<Validator<'_>>,
    ) -> Result<String, PromptError>;

    /// Ask a yes/no question.
    ///
    /// # Errors
    ///
    /// Closed input or I/O failure.
    fn input_bool(&mut self, question: &Question<'_>, default: bool) -> Result<bool, PromptError>;

    /// Ask for an integer.
    ///
    /// # Errors
    ///
    /// Closed input, I/O failure, or a rejected answer.
    fn input_int(
        &mut self,
        question: &Question<'_>,
        default: i64,
        validator: &dyn Fn(i64) -> Result<(), String>,
    ) -> Result<i64, PromptError> {
        let check = |raw: &str| -> Result<(), String> {
            let value = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("'{}' is not an integer", raw.trim()))?;
            validator(value)
        };
        let answer = self.input_string(question, &default.to_string(), true, Some(&check))?;
        answer
            .trim()
            .parse::<i64>()
            .map_err(|_| PromptError::Invalid(format!("'{answer}' is not an integer")))
    }

    /// Pick one of `options`. An empty answer takes `default`.
    ///
    /// # Errors
    ///
    /// Closed input, I/O failure, or no options to choose from.
    fn select(&mut self, question: &Question<'_>, options: &[String], default: &str) -> Result<String, PromptError>;

    /// Pick any number of `options`. An empty answer takes `defaults`.
    ///
    /// # Errors
    ///
    /// Closed input or I/O failure.
    fn multi_select(
        &mut self,
        question: &Question<'_>,
        options: &[String],
        defaults: &[String],
    ) -> Result<Vec<String>, PromptError>;

    /// Ask `Are you sure you want to {action}?`, defaulting to no.
    ///
    /// # Errors
    ///
    /// Closed input or I/O failure.
    fn confirm(&mut self, action: &str) -> Result<bool, PromptError>;
}

// ============================================================================
// Terminal implementation
// ============================================================================

/// Line-based prompter over any reader/writer pair.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stderr> {
    /// Prompter reading stdin and writing stderr.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    /// New prompter.
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consume the prompter and return its writer.
    pub fn into_output(self) -> W {
        self.output
    }

    fn read_answer(&mut self) -> Result<String, PromptError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::Closed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Print the question and read one line. `?` prints the help and asks again.
    fn ask(&mut self, question: &Question<'_>, hint: &str) -> Result<String, PromptError> {
        loop {
            if hint.is_empty() {
                write!(self.output, "? {}: ", question.text)?;
            } else {
                write!(self.output, "? {} ({hint}): ", question.text)?;
            }
            self.output.flush()?;

            let answer = self.read_answer()?;
            if answer.trim() == "?" && !question.help.is_empty() {
                writeln!(self.output, "  {}", question.help)?;
                continue;
            }
            return Ok(answer);
        }
    }

    fn reject(&mut self, reason: &str) -> Result<(), PromptError> {
        writeln!(self.output, "X Sorry, your reply was invalid: {reason}")?;
        Ok(())
    }

    fn list_options(&mut self, options: &[String]) -> Result<(), PromptError> {
        for (idx, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}) {option}", idx + 1)?;
        }
        Ok(())
    }
}

/// Resolve an answer to one of `options`, by 1-based index or exact value.
fn pick<'o>(options: &'o [String], answer: &str) -> Option<&'o String> {
    let answer = answer.trim();
    answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| options.get(idx))
        .or_else(|| options.iter().find(|o| o.as_str() == answer))
}

fn parse_bool(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" => Some(true),
        "n" | "no" | "false" => Some(false),
        _ => None,
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn input_string(
        &mut self,
        question: &Question<'_>,
        default: &str,
        required: bool,
        validator: Option<Validator<'_>>,
    ) -> Result<String, PromptError> {
        loop {
            let typed = self.ask(question, default)?;
            let answer = if typed.trim().is_empty() {
                default.to_string()
            } else {
                typed
            };

            if required && answer.trim().is_empty() {
                self.reject("Value is required")?;
                continue;
            }
            if let Some(check) = validator
                && !(answer.is_empty() && !required)
                && let Err(reason) = check(&answer)
            {
                self.reject(&reason)?;
                continue;
            }
            return Ok(answer);
        }
    }

    fn input_bool(&mut self, question: &Question<'_>, default: bool) -> Result<bool, PromptError> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let answer = self.ask(question, hint)?;
            if answer.trim().is_empty() {
                return Ok(default);
            }
            match parse_bool(&answer) {
                Some(value) => return Ok(value),
                None => self.reject("answer yes or no")?,
            }
        }
    }

    fn select(&mut self, question: &Question<'_>, options: &[String], default: &str) -> Result<String, PromptError> {
        if options.is_empty() {
            return Err(PromptError::Invalid(format!("no options available for '{}'", question.text)));
        }
        self.list_options(options)?;
        loop {
            let answer = self.ask(question, default)?;
            if answer.trim().is_empty() && options.iter().any(|o| o == default) {
                return Ok(default.to_string());
            }
            match pick(options, &answer) {
                Some(choice) => return Ok(choice.clone()),
                None => self.reject("choose one of the listed options")?,
            }
        }
    }

    fn multi_select(
        &mut self,
        question: &Question<'_>,
        options: &[String],
        defaults: &[String],
    ) -> Result<Vec<String>, PromptError> {
        if options.is_empty() {
            return Ok(Vec::new());
        }
        self.list_options(options)?;
        let hint = defaults.join(",");
        'ask: loop {
            let answer = self.ask(question, &hint)?;
            if answer.trim().is_empty() {
                return Ok(defaults.to_vec());
            }
            let mut chosen: Vec<String> = Vec::new();
            for part in answer.split(',').filter(|p| !p.trim().is_empty()) {
                match pick(options, part) {
                    Some(choice) if !chosen.contains(choice) => chosen.push(choice.clone()),
                    Some(_) => {}
                    None => {
                        self.reject(&format!("'{}' is not one of the listed options", part.trim()))?;
                        continue 'ask;
                    }
                }
            }
            return Ok(chosen);
        }
    }

    fn confirm(&mut self, action: &str) -> Result<bool, PromptError> {
        let text = format!("Are you sure you want to {action}?");
        self.input_bool(&Question::new(&text, ""), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(script: &str) -> TerminalPrompter<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalPrompter::new(Cursor::new(script.as_bytes().to_vec()), Vec::new())
    }

    fn transcript(p: TerminalPrompter<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(p.into_output()).unwrap()
    }

    #[test]
    fn empty_answer_takes_default() {
        let mut p = prompter("\n");
        let q = Question::new("Machine pool name", "");
        assert_eq!(p.input_string(&q, "workers", true, None).unwrap(), "workers");
    }

    #[test]
    fn invalid_answers_are_asked_again() {
        let mut p = prompter("Bad Name\nworkers\n");
        let q = Question::new("Machine pool name", "");
        let check = |s: &str| {
            if s.chars().all(|c| c.is_ascii_lowercase()) {
                Ok(())
            } else {
                Err("must be lowercase".to_string())
            }
        };
        assert_eq!(p.input_string(&q, "", true, Some(&check)).unwrap(), "workers");
        assert!(transcript(p).contains("X Sorry, your reply was invalid: must be lowercase"));
    }

    #[test]
    fn question_mark_prints_help() {
        let mut p = prompter("?\nyes\n");
        let q = Question::new("Enable autoscaling", "Scale between min and max replicas");
        assert!(p.input_bool(&q, false).unwrap());
        assert!(transcript(p).contains("Scale between min and max replicas"));
    }

    #[test]
    fn integers_are_validated() {
        let mut p = prompter("two\n4\n3\n");
        let q = Question::new("Replicas", "");
        let multiple_of_three = |n: i64| {
            if n % 3 == 0 {
                Ok(())
            } else {
                Err("not a multiple of 3".to_string())
            }
        };
        assert_eq!(p.input_int(&q, 0, &multiple_of_three).unwrap(), 3);
    }

    #[test]
    fn select_accepts_index_or_value() {
        let options = vec!["us-east-1a".to_string(), "us-east-1b".to_string()];
        let q = Question::new("AWS availability zone", "");

        let mut p = prompter("2\n");
        assert_eq!(p.select(&q, &options, "us-east-1a").unwrap(), "us-east-1b");

        let mut p = prompter("nope\nus-east-1a\n");
        assert_eq!(p.select(&q, &options, "").unwrap(), "us-east-1a");

        let mut p = prompter("\n");
        assert_eq!(p.select(&q, &options, "us-east-1b").unwrap(), "us-east-1b");
    }

    #[test]
    fn multi_select_deduplicates() {
        let options = vec!["sg-1".to_string(), "sg-2".to_string(), "sg-3".to_string()];
        let q = Question::new("Additional security groups", "");
        let mut p = prompter("1, sg-3, 1\n");
        assert_eq!(p.multi_select(&q, &options, &[]).unwrap(), vec!["sg-1", "sg-3"]);

        let mut p = prompter("\n");
        assert_eq!(
            p.multi_select(&q, &options, &["sg-2".to_string()]).unwrap(),
            vec!["sg-2"]
        );
    }

    #[test]
    fn confirm_defaults_to_no_and_closed_input_errors() {
        let mut p = prompter("\n");
        assert!(!p.confirm("delete machine pool 'mp1' on cluster 'c1'").unwrap());

        let mut p = prompter("");
        assert!(matches!(p.confirm("do it"), Err(PromptError::Closed)));
    }
}
