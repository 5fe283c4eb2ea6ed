/// A directive split into its command name and argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub args: Vec<String>,
    /// Everything after the name and the one whitespace character that ends
    /// it, byte for byte. Code handed to executors comes from here.
    pub arg_text: String,
}

impl Directive {
    #[must_use]
    pub fn arg_text(&self) -> &str {
        &self.arg_text
    }

    #[must_use]
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// Returns `true` when `marker` occupies position 0 of `input`.
#[must_use]
pub fn is_directive(input: &str, marker: char) -> bool {
    input.starts_with(marker)
}

/// Parses `input` as a directive. Returns `None` for ordinary conversational
/// content. There is no quoting: tokens are whitespace-delimited.
#[must_use]
pub fn parse_directive(input: &str, marker: char) -> Option<Directive> {
    let body = input.strip_prefix(marker)?;
    Some(split_directive(body))
}

/// Splits a directive body that has already had its marker removed.
#[must_use]
pub fn split_directive(body: &str) -> Directive {
    let body = body.trim_start();
    let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let (name, rest) = body.split_at(name_end);

    let mut after_separator = rest.chars();
    after_separator.next();

    Directive {
        name: name.to_string(),
        args: rest.split_whitespace().map(str::to_string).collect(),
        arg_text: after_separator.as_str().to_string(),
    }
}
