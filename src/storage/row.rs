//! Fixed-width row encoding.
//!
//! A row is the only record shape this store knows: `(id, username, email)`.
//! Every row occupies exactly [`ROW_SIZE`] bytes on disk, null-padded ASCII
//! for the two string fields.

use crate::errors::Error;

pub const USERNAME_CAPACITY: usize = 33;
pub const EMAIL_CAPACITY: usize = 256;
pub const ID_SIZE: usize = 4;
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_CAPACITY + EMAIL_CAPACITY;

pub const USERNAME_MAX_LEN: usize = USERNAME_CAPACITY - 1;
pub const EMAIL_MAX_LEN: usize = EMAIL_CAPACITY - 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    pub fn new(id: u32, username: impl Into<String>, email: impl Into<String>) -> Self {
        Row {
            id,
            username: username.into(),
            email: email.into(),
        }
    }

    /// Serializes the row into its fixed `ROW_SIZE`-byte on-disk form.
    pub fn encode(&self) -> [u8; ROW_SIZE] {
        let mut buf = [0u8; ROW_SIZE];
        buf[0..ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        write_fixed(
            &mut buf[ID_SIZE..ID_SIZE + USERNAME_CAPACITY],
            &self.username,
        );
        write_fixed(
            &mut buf[ID_SIZE + USERNAME_CAPACITY..ROW_SIZE],
            &self.email,
        );
        buf
    }

    /// Parses a row back out of a `ROW_SIZE`-byte buffer.
    pub fn decode(bytes: &[u8]) -> Result<Row, Error> {
        if bytes.len() != ROW_SIZE {
            return Err(Error::Storage(format!(
                "row buffer has wrong size (got {}, expected {})",
                bytes.len(),
                ROW_SIZE
            )));
        }
        let id = u32::from_le_bytes(bytes[0..ID_SIZE].try_into().unwrap());
        let username = read_fixed(&bytes[ID_SIZE..ID_SIZE + USERNAME_CAPACITY]);
        let email = read_fixed(&bytes[ID_SIZE + USERNAME_CAPACITY..ROW_SIZE]);
        Ok(Row {
            id,
            username,
            email,
        })
    }
}

fn write_fixed(dest: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    dest[..bytes.len()].copy_from_slice(bytes);
}

fn read_fixed(src: &[u8]) -> String {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    String::from_utf8_lossy(&src[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let row = Row::new(7, "cstack", "foo@bar.com");
        let decoded = Row::decode(&row.encode()).unwrap();
        assert_eq!(row, decoded);
    }

    #[test]
    fn pads_short_fields_with_zeros() {
        let row = Row::new(1, "a", "b");
        let encoded = row.encode();
        assert_eq!(encoded[ID_SIZE + 1], 0);
        assert_eq!(encoded[ID_SIZE + USERNAME_CAPACITY + 1], 0);
    }
}
