//! Remote Clients
//!
//! HTTP access to the two upstreams the app aggregates:
//!
//! - **bungie**: Bungie.net's public Destiny 2 API plus the manifest content host
//! - **backend**: the private stats backend (roster, weapons, collectibles)
//!
//! Both share [`Upstream`], which owns timeouts, default headers, the
//! injected `Authorization` value and failure logging. Every accessor is a
//! single GET returning the decoded JSON body.

mod backend;
mod bungie;
mod error;
mod upstream;

pub use backend::{BackendClient, BackendResource, WeaponSlot};
pub use bungie::{BungieClient, BungieEndpoint, ContentResolver, PC_MEMBERSHIP_TYPE};
pub use error::TransportError;
pub use upstream::{Upstream, UpstreamConfig};

#[cfg(test)]
pub(crate) mod test_support {
    use axum::Router;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Serve `router` on an ephemeral local port and return its base URL
    pub async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// In-memory log sink for asserting on emitted events
    #[derive(Clone, Default)]
    pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

    pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl<'a> MakeWriter<'a> for LogCapture {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            CaptureWriter(Arc::clone(&self.0))
        }
    }

    impl io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut guard = self
                .0
                .lock()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "lock poisoned"))?;
            guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogCapture {
        /// Plain-text subscriber writing into this buffer
        pub fn subscriber(&self, level: tracing::Level) -> impl tracing::Subscriber + Send + Sync {
            tracing_subscriber::fmt()
                .with_writer(self.clone())
                .with_ansi(false)
                .with_max_level(level)
                .finish()
        }

        pub fn output(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }
}
