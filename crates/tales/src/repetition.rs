use crate::value::Value;
use std::sync::Arc;

/// The state of one `tal:repeat` iteration, exposed as `repeat/<name>/...`.
///
/// Every member is derived on demand from the current index and the source
/// sequence.
#[derive(Debug, Clone)]
pub struct RepetitionInfo {
    pub name: String,
    pub index: usize,
    items: Arc<Vec<Value>>,
}

impl RepetitionInfo {
    pub fn new(name: impl Into<String>, index: usize, items: Arc<Vec<Value>>) -> Self {
        Self {
            name: name.into(),
            index,
            items,
        }
    }

    /// The item bound to the loop variable.
    pub fn current(&self) -> Value {
        self.items.get(self.index).cloned().unwrap_or_default()
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn length(&self) -> usize {
        self.items.len()
    }

    pub fn try_get(&self, name: &str) -> Option<Value> {
        let value = match name {
            "index" => Value::from(self.index),
            "number" => Value::from(self.number()),
            "even" => Value::Bool(self.index % 2 == 0),
            "odd" => Value::Bool(self.index % 2 != 0),
            "start" => Value::Bool(self.index == 0),
            "end" => Value::Bool(self.index + 1 == self.length()),
            "length" => Value::from(self.length()),
            "letter" => Value::String(alphabetic(self.index)),
            "Letter" => Value::String(alphabetic(self.index).to_uppercase()),
            "roman" => Value::String(roman(self.number()).to_lowercase()),
            "Roman" => Value::String(roman(self.number())),
            _ => return None,
        };
        Some(value)
    }
}

/// Bijective base-26 lowercase letters: 0 → `a`, 25 → `z`, 26 → `aa`.
pub fn alphabetic(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'a' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Uppercase roman numerals. Zero yields an empty string.
pub fn roman(number: usize) -> String {
    const NUMERALS: [(usize, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut remaining = number;
    let mut out = String::new();
    for (value, numeral) in NUMERALS {
        while remaining >= value {
            out.push_str(numeral);
            remaining -= value;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(index: usize, count: usize) -> RepetitionInfo {
        let items = (0..count).map(Value::from).collect();
        RepetitionInfo::new("item", index, Arc::new(items))
    }

    #[test]
    fn positional_members() {
        let first = info(0, 3);
        assert_eq!(first.try_get("index"), Some(Value::Int(0)));
        assert_eq!(first.try_get("number"), Some(Value::Int(1)));
        assert_eq!(first.try_get("even"), Some(Value::Bool(true)));
        assert_eq!(first.try_get("odd"), Some(Value::Bool(false)));
        assert_eq!(first.try_get("start"), Some(Value::Bool(true)));
        assert_eq!(first.try_get("end"), Some(Value::Bool(false)));
        assert_eq!(first.try_get("length"), Some(Value::Int(3)));

        let last = info(2, 3);
        assert_eq!(last.try_get("end"), Some(Value::Bool(true)));
        assert_eq!(last.try_get("start"), Some(Value::Bool(false)));
        assert_eq!(last.current(), Value::Int(2));
    }

    #[test]
    fn letters_and_numerals() {
        let item = info(3, 5);
        assert_eq!(item.try_get("letter"), Some(Value::from("d")));
        assert_eq!(item.try_get("Letter"), Some(Value::from("D")));
        assert_eq!(item.try_get("roman"), Some(Value::from("iv")));
        assert_eq!(item.try_get("Roman"), Some(Value::from("IV")));
        assert_eq!(item.try_get("unknown"), None);
    }

    #[test]
    fn alphabetic_wraps_to_two_letters() {
        assert_eq!(alphabetic(0), "a");
        assert_eq!(alphabetic(25), "z");
        assert_eq!(alphabetic(26), "aa");
        assert_eq!(alphabetic(27), "ab");
        assert_eq!(alphabetic(701), "zz");
        assert_eq!(alphabetic(702), "aaa");
    }

    #[test]
    fn roman_numerals() {
        assert_eq!(roman(1), "I");
        assert_eq!(roman(14), "XIV");
        assert_eq!(roman(1994), "MCMXCIV");
        assert_eq!(roman(0), "");
    }
}
