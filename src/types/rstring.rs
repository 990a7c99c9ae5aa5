/// String value type. Keys and values on the wire are whitespace-free
/// tokens (see spec §6), so unlike a binary-safe Redis string this is a
/// plain `String`, not a byte buffer.
#[derive(Debug, Clone)]
pub struct LineString {
    data: String,
}

impl LineString {
    pub fn new(data: String) -> Self {
        LineString { data }
    }

    pub fn from_i64(n: i64) -> Self {
        LineString { data: n.to_string() }
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Try to parse the value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        self.data.parse::<i64>().ok()
    }

    /// Increment by delta, returning the new value. Errs if the current
    /// text doesn't parse as a base-10 i64, or the result would overflow.
    pub fn incr_by(&mut self, delta: i64) -> Result<i64, &'static str> {
        let current = self
            .as_i64()
            .ok_or("value is not an integer or out of range")?;
        let new_val = current
            .checked_add(delta)
            .ok_or("value is not an integer or out of range")?;
        self.data = new_val.to_string();
        Ok(new_val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incr_by_parses_and_updates() {
        let mut s = LineString::new("41".to_string());
        assert_eq!(s.incr_by(1), Ok(42));
        assert_eq!(s.as_str(), "42");
    }

    #[test]
    fn incr_by_rejects_non_integer() {
        let mut s = LineString::new("xyz".to_string());
        assert!(s.incr_by(1).is_err());
    }

    #[test]
    fn incr_by_rejects_overflow() {
        let mut s = LineString::new(i64::MAX.to_string());
        assert!(s.incr_by(1).is_err());
    }
}
