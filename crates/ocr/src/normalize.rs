use tezgah_core::text::to_upper_tr;

/// Uppercase receipt text with Turkish rules so keyword search sees
/// `İ`/`I` the way the printer meant them (`istanbul` → `İSTANBUL`).
pub fn normalize(text: &str) -> String {
    to_upper_tr(text)
}

/// Repair the usual OCR digit/letter confusions and use `.` as the decimal
/// separator: `1O,50` → `10.50`, `B,99` → `8.99`.
pub fn normalize_numeric(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'O' | 'o' => '0',
            'I' | 'l' => '1',
            'B' => '8',
            'S' => '5',
            'Z' => '2',
            ',' => '.',
            c => c,
        })
        .collect()
}
