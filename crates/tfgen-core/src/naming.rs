use heck::ToSnakeCase;

/// Turn an OpenAPI property name into a Terraform attribute identifier.
///
/// Terraform accepts lowercase ASCII letters, digits and underscores, and
/// the first character must not be a digit.
pub fn terraform_identifier(name: &str) -> String {
    let snake = sanitize_identifier(name).to_snake_case();
    if snake.is_empty() {
        return "unnamed".to_string();
    }
    if snake.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("_{snake}");
    }
    snake
}

/// Whether `name` is already a valid Terraform identifier.
pub fn is_terraform_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Replace runs of non-identifier characters with a single separator.
fn sanitize_identifier(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut prev_was_separator = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if prev_was_separator && !result.is_empty() {
                result.push('_');
            }
            result.push(ch);
            prev_was_separator = false;
        } else {
            prev_was_separator = true;
        }
    }
    result
}
