//! Session bus surface of the primary instance and the client used by CLI
//! invocations to reach it.

use std::sync::mpsc;

use thiserror::Error;
use zbus::blocking::connection::Builder;
use zbus::interface;

pub const SERVICE_NAME: &str = "io.github.shotlift.Shotlift";
pub const OBJECT_PATH: &str = "/";
pub const INTERFACE_NAME: &str = "io.github.shotlift.Shotlift";

#[derive(Debug, Error)]
pub enum BusError {
    #[error("d-bus error: {0}")]
    Zbus(#[from] zbus::Error),
    #[error("primary instance stopped accepting capture requests")]
    Disconnected,
}

/// One capture request as carried over the bus. Arguments keep the
/// positional order of the remote methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    FullScreen {
        path: String,
        to_clipboard: bool,
        delay: i32,
    },
    GraphicCapture {
        path: String,
        delay: i32,
    },
}

impl RemoteCommand {
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::FullScreen { .. } => "fullScreen",
            Self::GraphicCapture { .. } => "graphicCapture",
        }
    }

    /// Issues the matching remote call on `remote`.
    pub fn send_to(&self, remote: &dyn RemoteCapture) -> Result<(), BusError> {
        match self {
            Self::FullScreen {
                path,
                to_clipboard,
                delay,
            } => remote.full_screen(path, *to_clipboard, *delay),
            Self::GraphicCapture { path, delay } => remote.graphic_capture(path, *delay),
        }
    }
}

/// Remote-callable operations of the primary instance.
pub trait RemoteCapture {
    fn full_screen(&self, path: &str, to_clipboard: bool, delay: i32) -> Result<(), BusError>;
    fn graphic_capture(&self, path: &str, delay: i32) -> Result<(), BusError>;
}

/// Connects to the session bus per call; a CLI process makes at most one.
#[derive(Debug, Default)]
pub struct SessionBusClient;

impl SessionBusClient {
    fn call<B>(&self, method: &'static str, body: &B) -> Result<(), BusError>
    where
        B: serde::Serialize + zbus::zvariant::DynamicType,
    {
        let connection = zbus::blocking::Connection::session()?;
        let proxy =
            zbus::blocking::Proxy::new(&connection, SERVICE_NAME, OBJECT_PATH, INTERFACE_NAME)?;
        tracing::debug!(method, destination = SERVICE_NAME, "forwarding capture request");
        proxy.call_method(method, body)?;
        Ok(())
    }
}

impl RemoteCapture for SessionBusClient {
    fn full_screen(&self, path: &str, to_clipboard: bool, delay: i32) -> Result<(), BusError> {
        self.call("fullScreen", &(path, to_clipboard, delay))
    }

    fn graphic_capture(&self, path: &str, delay: i32) -> Result<(), BusError> {
        self.call("graphicCapture", &(path, delay))
    }
}

/// Object served at [`OBJECT_PATH`]. Calls arrive on the bus executor thread
/// and are queued for the GTK main loop.
pub struct CaptureService {
    requests: mpsc::Sender<RemoteCommand>,
}

impl CaptureService {
    pub fn new(requests: mpsc::Sender<RemoteCommand>) -> Self {
        Self { requests }
    }

    fn enqueue(&self, command: RemoteCommand) -> zbus::fdo::Result<()> {
        tracing::info!(method = command.method_name(), ?command, "received capture request");
        self.requests.send(command).map_err(|_| {
            tracing::warn!("capture request queue closed");
            zbus::fdo::Error::Failed(BusError::Disconnected.to_string())
        })
    }
}

#[interface(name = "io.github.shotlift.Shotlift")]
impl CaptureService {
    #[zbus(name = "fullScreen")]
    fn full_screen(&self, path: String, to_clipboard: bool, delay: i32) -> zbus::fdo::Result<()> {
        self.enqueue(RemoteCommand::FullScreen {
            path,
            to_clipboard,
            delay,
        })
    }

    #[zbus(name = "graphicCapture")]
    fn graphic_capture(&self, path: String, delay: i32) -> zbus::fdo::Result<()> {
        self.enqueue(RemoteCommand::GraphicCapture { path, delay })
    }
}

/// Claims [`SERVICE_NAME`] and serves the capture interface. The returned
/// connection must stay alive for as long as the service should answer.
pub fn serve(
    requests: mpsc::Sender<RemoteCommand>,
) -> Result<zbus::blocking::Connection, BusError> {
    let connection = Builder::session()?
        .name(SERVICE_NAME)?
        .serve_at(OBJECT_PATH, CaptureService::new(requests))?
        .build()?;
    tracing::info!(
        service = SERVICE_NAME,
        path = OBJECT_PATH,
        "registered capture service on session bus"
    );
    Ok(connection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingRemote {
        calls: RefCell<Vec<String>>,
    }

    impl RemoteCapture for RecordingRemote {
        fn full_screen(&self, path: &str, to_clipboard: bool, delay: i32) -> Result<(), BusError> {
            self.calls
                .borrow_mut()
                .push(format!("fullScreen({path},{to_clipboard},{delay})"));
            Ok(())
        }

        fn graphic_capture(&self, path: &str, delay: i32) -> Result<(), BusError> {
            self.calls
                .borrow_mut()
                .push(format!("graphicCapture({path},{delay})"));
            Ok(())
        }
    }

    #[test]
    fn send_to_maps_commands_to_matching_methods() {
        let remote = RecordingRemote::default();
        RemoteCommand::FullScreen {
            path: "/tmp".to_string(),
            to_clipboard: true,
            delay: 250,
        }
        .send_to(&remote)
        .unwrap();
        RemoteCommand::GraphicCapture {
            path: String::new(),
            delay: 0,
        }
        .send_to(&remote)
        .unwrap();

        assert_eq!(
            *remote.calls.borrow(),
            vec!["fullScreen(/tmp,true,250)", "graphicCapture(,0)"]
        );
    }

    #[test]
    fn capture_service_queues_requests_in_order() {
        let (tx, rx) = mpsc::channel();
        let service = CaptureService::new(tx);
        service
            .full_screen("/tmp".to_string(), false, 500)
            .expect("queue open");
        service
            .graphic_capture(String::new(), 10)
            .expect("queue open");

        assert_eq!(
            rx.try_recv().unwrap(),
            RemoteCommand::FullScreen {
                path: "/tmp".to_string(),
                to_clipboard: false,
                delay: 500
            }
        );
        assert_eq!(rx.try_recv().unwrap().method_name(), "graphicCapture");
    }

    #[test]
    fn capture_service_fails_when_queue_closed() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let service = CaptureService::new(tx);
        assert!(service.graphic_capture(String::new(), 0).is_err());
    }
}
