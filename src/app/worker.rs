use std::sync::mpsc;
use std::time::Duration;

use gtk4::glib;

pub(super) const WORKER_RESULT_POLL_INTERVAL: Duration = Duration::from_millis(24);

/// Runs `work` on a new thread and hands its single result to `on_result`
/// on the GTK main loop. `None` means the worker died without reporting.
pub(super) fn spawn_worker_action<T, W, H>(work: W, on_result: H)
where
    T: Send + 'static,
    W: FnOnce() -> T + Send + 'static,
    H: FnOnce(Option<T>) + 'static,
{
    let (tx, rx) = mpsc::channel::<T>();
    std::thread::spawn(move || {
        let result = work();
        let _ = tx.send(result);
    });

    let mut on_result = Some(on_result);
    glib::timeout_add_local(WORKER_RESULT_POLL_INTERVAL, move || match rx.try_recv() {
        Ok(result) => {
            if let Some(on_result) = on_result.take() {
                on_result(Some(result));
            }
            glib::ControlFlow::Break
        }
        Err(mpsc::TryRecvError::Empty) => glib::ControlFlow::Continue,
        Err(mpsc::TryRecvError::Disconnected) => {
            tracing::warn!("worker thread exited without a result");
            if let Some(on_result) = on_result.take() {
                on_result(None);
            }
            glib::ControlFlow::Break
        }
    });
}

/// Drains `rx` on the main loop for as long as the sender side lives.
pub(super) fn attach_queue<T, H>(rx: mpsc::Receiver<T>, mut on_item: H)
where
    T: 'static,
    H: FnMut(T) + 'static,
{
    glib::timeout_add_local(WORKER_RESULT_POLL_INTERVAL, move || loop {
        match rx.try_recv() {
            Ok(item) => on_item(item),
            Err(mpsc::TryRecvError::Empty) => return glib::ControlFlow::Continue,
            Err(mpsc::TryRecvError::Disconnected) => {
                tracing::debug!("request queue closed; stop polling");
                return glib::ControlFlow::Break;
            }
        }
    });
}
