use crate::models::Symbol;

/// Turns user input like `"nflx, intc,,NFLX"` into `[NFLX, INTC]`.
///
/// Entries are trimmed and uppercased, blanks are skipped and the first
/// occurrence of a repeated ticker wins.
pub fn parse_symbol_list(input: &str) -> Vec<Symbol> {
    let mut symbols: Vec<Symbol> = Vec::new();
    for raw in input.split(',') {
        let ticker = raw.trim().to_uppercase();
        if ticker.is_empty() {
            continue;
        }
        let symbol = Symbol::new(ticker);
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_manual_tickers() {
        let symbols = parse_symbol_list(" nflx, intc,,NFLX ,xv2.f");
        let names: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["NFLX", "INTC", "XV2.F"]);
    }

    #[test]
    fn empty_input_yields_no_symbols() {
        assert!(parse_symbol_list("").is_empty());
        assert!(parse_symbol_list(" , ,").is_empty());
    }
}
