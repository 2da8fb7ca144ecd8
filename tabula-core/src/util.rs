/// Write `values` into `out` through `f`, putting `separator` between the ones that produced output.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Longest prefix of `value` not exceeding `max` bytes that ends on a char boundary.
pub fn printable_prefix(value: &str, max: usize) -> &str {
    let mut end = value.len().min(max);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].trim_end()
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            $crate::printable_prefix(&$query, 497),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}

/// Log the error at the error level and give it back, for use in `map_err`.
#[macro_export]
macro_rules! log_error {
    ($error:expr) => {{
        let error: $crate::Error = $error;
        $crate::log::error!("{:#}", error);
        error
    }};
}
