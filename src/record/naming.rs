//! Canonical field naming

/// Convert an inbound field name to its canonical snake_case form.
///
/// Follows inflection-style underscoring: a boundary is inserted between a
/// lowercase letter or digit and an uppercase letter (`DayOfWeek` →
/// `day_of_week`, `Promo2SinceWeek` → `promo2_since_week`) and at the end of
/// an acronym run (`HTTPServer` → `http_server`). Spaces and hyphens become
/// underscores.
pub fn normalize_field_name(name: &str) -> String {
    let chars: Vec<char> = name.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            let after_lower = prev.is_ascii_lowercase() || prev.is_ascii_digit();
            let acronym_end = prev.is_ascii_uppercase() && next.is_some_and(|n| n.is_ascii_lowercase());
            if after_lower || acronym_end {
                out.push('_');
            }
        }

        match c {
            ' ' | '-' => out.push('_'),
            _ => out.extend(c.to_lowercase()),
        }
    }

    out
}
