use crate::errors::*;
use crate::proto::field_table::{FieldTable, FieldValue};
use crate::proto::{
    ConnectionOpen, ConnectionStart, ConnectionStartOk, ConnectionTune, ConnectionTuneOk,
    FRAME_MIN_SIZE,
};
use crate::Sasl;
use std::time::Duration;

const DEFAULT_CHANNEL_MAX: u16 = 2047;
const DEFAULT_FRAME_MAX: u32 = 131_072;
const DEFAULT_HEARTBEAT: u16 = 60;

/// Options that control the overall AMQP connection.
///
/// `ConnectionOptions` uses the builder pattern. The default settings are
/// equivalent to
///
/// ```rust
/// use warren::{Auth, ConnectionOptions};
///
/// # fn default_connection_options() -> ConnectionOptions<Auth> {
/// ConnectionOptions::default()
///     .auth(Auth::default())
///     .virtual_host("/")
///     .locale("en_US")
///     .channel_max(2047)
///     .frame_max(131_072)
///     .heartbeat(60)
///     .connection_timeout(None)
///     .connection_name(None)
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ConnectionOptions<Auth: Sasl> {
    pub(crate) auth: Auth,
    pub(crate) virtual_host: String,
    pub(crate) locale: String,
    pub(crate) channel_max: u16,
    pub(crate) frame_max: u32,
    pub(crate) heartbeat: u16,
    pub(crate) connection_timeout: Option<Duration>,
    pub(crate) connection_name: Option<String>,
}

impl<Auth: Sasl> Default for ConnectionOptions<Auth> {
    // NOTE: If we change this, make sure to change the doc comment above.
    fn default() -> Self {
        ConnectionOptions {
            auth: Auth::default(),
            virtual_host: "/".to_string(),
            locale: "en_US".to_string(),
            channel_max: DEFAULT_CHANNEL_MAX,
            frame_max: DEFAULT_FRAME_MAX,
            heartbeat: DEFAULT_HEARTBEAT,
            connection_timeout: None,
            connection_name: None,
        }
    }
}

impl<Auth: Sasl> ConnectionOptions<Auth> {
    /// Sets the SASL authentication method.
    pub fn auth(self, auth: Auth) -> Self {
        ConnectionOptions { auth, ..self }
    }

    /// Sets the AMQP virtual host.
    pub fn virtual_host<T: Into<String>>(self, virtual_host: T) -> Self {
        ConnectionOptions {
            virtual_host: virtual_host.into(),
            ..self
        }
    }

    /// Sets the locale. AMQP requires servers support the `en_US` locale
    /// (which is also the default locale for `ConnectionOptions`).
    pub fn locale<T: Into<String>>(self, locale: T) -> Self {
        ConnectionOptions {
            locale: locale.into(),
            ..self
        }
    }

    /// Sets the maximum number of channels that can be opened simultaneously
    /// on this connection. Setting this value to 0 means to let the server
    /// choose. If this value and the server's requested value differ, the
    /// lower of the two is used.
    pub fn channel_max(self, channel_max: u16) -> Self {
        ConnectionOptions {
            channel_max,
            ..self
        }
    }

    /// Sets the maximum size in bytes of frames used for this connection.
    /// Setting this value to 0 means to let the server choose. If this value
    /// and the server's requested value differ, the lower of the two is used.
    ///
    /// The frame max setting says nothing about the maximum size of messages;
    /// messages larger than `frame_max` bytes are broken up into multiple
    /// frames.
    ///
    /// Note that AMQP specifies a minimum frame_max of 4096; attempting to
    /// set a value lower than this will result in an error when attempting to
    /// open the connection.
    pub fn frame_max(self, frame_max: u32) -> Self {
        ConnectionOptions { frame_max, ..self }
    }

    /// Sets the heartbeat interval in seconds. Setting this value to 0
    /// disables heartbeats. If this value is greater than 0 but different
    /// than the server's requested heartbeat interval, the lower of the two
    /// is used.
    pub fn heartbeat(self, heartbeat: u16) -> Self {
        ConnectionOptions { heartbeat, ..self }
    }

    /// Sets the timeout for the connection handshake. If None (the default),
    /// there is no timeout.
    pub fn connection_timeout(self, connection_timeout: Option<Duration>) -> Self {
        ConnectionOptions {
            connection_timeout,
            ..self
        }
    }

    /// Sets the connection name advertised to the server in the
    /// client-properties table. RabbitMQ displays this name in its management
    /// interface.
    pub fn connection_name(self, connection_name: Option<String>) -> Self {
        ConnectionOptions {
            connection_name,
            ..self
        }
    }

    pub(crate) fn make_start_ok(
        &self,
        start: ConnectionStart,
    ) -> Result<(ConnectionStartOk, FieldTable)> {
        // helper to search space-separated strings (mechanisms and locales)
        fn server_supports(server: &str, client: &str) -> bool {
            server.split(' ').any(|s| s == client)
        }

        // ensure our requested auth mechanism and locale are available
        let mechanism = self.auth.mechanism();
        if !server_supports(&start.mechanisms, &mechanism) {
            return UnsupportedAuthMechanismSnafu {
                available: start.mechanisms,
                requested: mechanism,
            }
            .fail();
        }
        if !server_supports(&start.locales, &self.locale) {
            return UnsupportedLocaleSnafu {
                available: start.locales,
                requested: self.locale.clone(),
            }
            .fail();
        }

        // bundle up info about this crate as client properties
        let mut client_properties = FieldTable::new();
        let mut set_prop = |k: &str, v: String| {
            client_properties.insert(k.to_string(), FieldValue::LongString(v));
        };
        set_prop("product", env!("CARGO_PKG_NAME").to_string());
        set_prop("version", env!("CARGO_PKG_VERSION").to_string());
        set_prop("platform", std::env::consts::OS.to_string());
        if let Some(connection_name) = &self.connection_name {
            set_prop("connection_name", connection_name.clone());
        }
        let mut capabilities = FieldTable::new();
        let mut set_cap = |k: &str| {
            capabilities.insert(k.to_string(), FieldValue::Boolean(true));
        };
        set_cap("consumer_cancel_notify");
        set_cap("connection.blocked");
        client_properties.insert(
            "capabilities".to_string(),
            FieldValue::FieldTable(capabilities),
        );

        Ok((
            ConnectionStartOk {
                client_properties,
                mechanism,
                response: self.auth.response(),
                locale: self.locale.clone(),
            },
            start.server_properties,
        ))
    }

    pub(crate) fn make_tune_ok(&self, tune: ConnectionTune) -> Result<ConnectionTuneOk> {
        fn promote_0_u16(mut val: u16) -> u16 {
            if val == 0 {
                val = u16::MAX;
            }
            val
        }
        fn promote_0_u32(mut val: u32) -> u32 {
            if val == 0 {
                val = u32::MAX;
            }
            val
        }

        let channel_max = u16::min(
            promote_0_u16(tune.channel_max),
            promote_0_u16(self.channel_max),
        );
        let frame_max = u32::min(promote_0_u32(tune.frame_max), promote_0_u32(self.frame_max));
        let heartbeat = u16::min(tune.heartbeat, self.heartbeat);

        if frame_max < FRAME_MIN_SIZE {
            return FrameMaxTooSmallSnafu {
                min: FRAME_MIN_SIZE,
                requested: frame_max,
            }
            .fail();
        }

        Ok(ConnectionTuneOk {
            channel_max,
            frame_max,
            heartbeat,
        })
    }

    pub(crate) fn make_open(&self) -> ConnectionOpen {
        ConnectionOpen {
            virtual_host: self.virtual_host.clone(),
        }
    }
}
