use crate::proto::field_table::{self, FieldTable, FieldValue};
use bytes::BytesMut;

/// Trait implemented by types that can perform SASL authentication during the
/// connection handshake.
pub trait Sasl: Default + Clone + Send + 'static {
    fn mechanism(&self) -> String;
    fn response(&self) -> String;
}

/// Built-in SASL mechanisms.
#[derive(Debug, Clone)]
pub enum Auth {
    /// Plain username/password authentication; the default mechanism.
    Plain { username: String, password: String },

    /// The legacy AMQPLAIN mechanism, which packs the credentials into a
    /// field table.
    AmqPlain { username: String, password: String },

    /// External authentication (e.g. via TLS client certificates).
    External,
}

impl Default for Auth {
    fn default() -> Auth {
        Auth::Plain {
            username: "guest".to_string(),
            password: "guest".to_string(),
        }
    }
}

impl Sasl for Auth {
    fn mechanism(&self) -> String {
        match *self {
            Auth::Plain { .. } => "PLAIN".to_string(),
            Auth::AmqPlain { .. } => "AMQPLAIN".to_string(),
            Auth::External => "EXTERNAL".to_string(),
        }
    }

    fn response(&self) -> String {
        match self {
            Auth::Plain { username, password } => format!("\x00{}\x00{}", username, password),
            Auth::AmqPlain { username, password } => {
                let mut table = FieldTable::new();
                table.insert("LOGIN".to_string(), FieldValue::LongString(username.clone()));
                table.insert(
                    "PASSWORD".to_string(),
                    FieldValue::LongString(password.clone()),
                );
                let mut buf = BytesMut::new();
                // short credential strings cannot exceed the field limits
                field_table::encode_table(&mut buf, &table).expect("credential table encoding");
                // AMQPLAIN responses are the table contents without the
                // 4-byte length prefix
                String::from_utf8_lossy(&buf[4..]).into_owned()
            }
            Auth::External => String::new(),
        }
    }
}
