//! POSIX shell quoting for commands run on remote hosts.

/// Punctuation that never needs quoting
const SAFE_PUNCTUATION: &str = "@%+=:,./-";

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || SAFE_PUNCTUATION.contains(c)
}

/// Quote a token so it reaches the remote shell as a single word
pub fn shell_quote(token: &str) -> String {
    if token.is_empty() {
        return "''".to_string();
    }

    if token.chars().all(is_safe) {
        return token.to_string();
    }

    format!("'{}'", token.replace('\'', r#"'"'"'"#))
}

/// Quote every token and join them into one command line
pub fn shell_join<I, S>(tokens: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|token| shell_quote(token.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
