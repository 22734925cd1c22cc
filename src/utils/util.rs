use super::Error;

pub fn handle_error_and_exit(err: Error) -> ! {
    log::error!("{}", err);
    std::process::exit(1);
}

pub fn format_number_with_commas(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
