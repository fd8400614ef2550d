use std::fmt::{Display, Write};

/// Render every item and join them with `delimiter`.
pub fn join<I, F, D>(items: I, delimiter: &str, mut render: F) -> String
where
    I: IntoIterator,
    F: FnMut(I::Item) -> D,
    D: Display,
{
    let mut result = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            result.push_str(delimiter);
        }
        let _ = write!(result, "{}", render(item));
    }
    result
}

pub fn find<'a, T: PartialEq>(value: &T, table: &[(T, &'a str)]) -> Option<&'a str> {
    table
        .iter()
        .find(|(candidate, _)| candidate == value)
        .map(|(_, name)| *name)
}

/// Reverse lookup, ignoring ASCII case.
pub fn find_by_name<T: Copy>(name: &str, table: &[(T, &str)]) -> Option<T> {
    table
        .iter()
        .find(|(_, candidate)| candidate.eq_ignore_ascii_case(name))
        .map(|(value, _)| *value)
}

/// `value [Name]`, or just `value` when the table has no name for it.
pub fn enum_to_string<T: PartialEq + Display>(value: T, table: &[(T, &str)]) -> String {
    enum_to_string_with(value, table, |v| v.to_string())
}

pub fn enum_to_string_with<T, F>(value: T, table: &[(T, &str)], render: F) -> String
where
    T: PartialEq,
    F: FnOnce(&T) -> String,
{
    let mut result = render(&value);
    if let Some(name) = find(&value, table) {
        let _ = write!(result, " [{}]", name);
    }
    result
}

/// `[A, B]` for every table bit set in `value`, in table order. Bits the
/// table does not name are appended as one hex number.
pub fn bitfield_to_string(value: u32, table: &[(u32, &str)]) -> String {
    let mut remaining = value;
    let mut parts: Vec<String> = Vec::new();
    for (bit, name) in table {
        if *bit != 0 && remaining & bit == *bit {
            remaining &= !bit;
            parts.push((*name).to_string());
        }
    }
    if remaining != 0 {
        parts.push(format!("{:#x}", remaining));
    }
    format!("[{}]", join(parts, ", ", |part| part))
}
