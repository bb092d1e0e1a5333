use rust_decimal::Decimal;

/// `1234567.891` with `"$"` gives `"$1,234,567.89"`. Negative amounts
/// (refunds) keep their sign in front of the symbol.
pub(crate) fn format_amount(val: Decimal, symbol: &str) -> String {
    let cents = val.round_dp(2);
    let digits = format!("{:.2}", cents.abs());
    let (whole, frac) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if cents.is_sign_negative() && !cents.is_zero() { "-" } else { "" };
    format!("{sign}{symbol}{grouped}.{frac}")
}

/// Cut `s` to at most `max` characters, ending in "…" when shortened.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some(_) if max == 0 => String::new(),
        Some(_) => {
            let mut out: String = s.chars().take(max - 1).collect();
            out.push('…');
            out
        }
    }
}

/// `[████░░░░]` filled to `ratio`, clamped to 0..=1.
pub(crate) fn progress_bar(ratio: f64, width: usize) -> String {
    let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Split `args` into an optional leading ISO date and the rest.
pub(crate) fn split_leading_date(args: &str) -> (Option<chrono::NaiveDate>, &str) {
    let args = args.trim();
    let (first, rest) = args.split_once(' ').unwrap_or((args, ""));
    match chrono::NaiveDate::parse_from_str(first, "%Y-%m-%d") {
        Ok(date) => (Some(date), rest.trim()),
        Err(_) => (None, args),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Motion {
    Down(usize),
    Up(usize),
    Top,
    Bottom,
}

/// Move a list selection and keep it inside the `page` rows that start at
/// `scroll`.
pub(crate) fn move_cursor(index: &mut usize, scroll: &mut usize, len: usize, page: usize, motion: Motion) {
    let last = len.saturating_sub(1);
    *index = match motion {
        Motion::Down(n) => index.saturating_add(n).min(last),
        Motion::Up(n) => index.saturating_sub(n),
        Motion::Top => 0,
        Motion::Bottom => last,
    };
    let page = page.max(1);
    if *index < *scroll {
        *scroll = *index;
    } else if *index >= *scroll + page {
        *scroll = *index + 1 - page;
    }
}
