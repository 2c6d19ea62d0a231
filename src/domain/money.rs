/// Renders an amount in minor units, e.g. `125050` -> `1,250.50 EGP`.
pub fn format_minor(amount: i64, currency: &str) -> String{
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    let whole = (abs / 100).to_string();
    let cents = abs % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}.{:02} {}", sign, grouped, cents, currency)
}
