use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::{
    cursor, event, execute,
    terminal::{self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::Config;
use crate::error::AppError;
use crate::runtime::{DockerClient, Runtime};

use super::{perform, render, App, Cmd, Msg};

/// How long the loop sleeps waiting for a message before re-checking the
/// quit flag.
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// Restore the terminal to normal mode. Safe to call multiple times.
pub fn restore_terminal() {
    let _ = execute!(io::stdout(), cursor::Show, LeaveAlternateScreen);
    let _ = disable_raw_mode();
}

/// Connect to the daemon, take over the terminal and run until the user
/// quits or `should_quit` is raised by a signal.
pub fn run(config: Config, should_quit: Arc<AtomicBool>) -> Result<(), AppError> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("berth-worker")
        .build()
        .expect("Failed to create tokio runtime");
    let guard = rt.enter();

    // Fail before touching the terminal so the error stays readable.
    let client = DockerClient::connect(config.host.as_deref()).map_err(AppError::Connect)?;
    rt.block_on(client.ping()).map_err(AppError::Connect)?;
    tracing::info!(host = config.host.as_deref().unwrap_or("local default"), "connected to daemon");
    let runtime = Arc::new(client);

    enable_raw_mode()?;
    if let Err(err) = execute!(io::stdout(), EnterAlternateScreen, cursor::Hide) {
        restore_terminal();
        return Err(err.into());
    }

    let (tx, rx) = mpsc::unbounded_channel();
    spawn_input_thread(tx.clone(), Arc::clone(&should_quit));

    let result = main_loop(&rt, &runtime, config, &should_quit, &tx, rx);

    restore_terminal();
    drop(guard);
    rt.shutdown_timeout(Duration::from_millis(500));
    tracing::info!("terminal restored");
    result
}

fn main_loop<R: Runtime>(
    rt: &tokio::runtime::Runtime,
    runtime: &Arc<R>,
    config: Config,
    should_quit: &AtomicBool,
    tx: &UnboundedSender<Msg>,
    mut rx: UnboundedReceiver<Msg>,
) -> Result<(), AppError> {
    let handle = rt.handle().clone();
    let mut app = App::new(config);

    let (cols, rows) = terminal::size()?;
    app.update(Msg::Resize(cols, rows));
    for cmd in app.init() {
        perform(&handle, runtime, cmd, tx);
    }

    let mut needs_render = true;
    loop {
        if should_quit.load(Ordering::Relaxed) || app.should_quit() {
            break;
        }

        if needs_render {
            render::render(&app)?;
            needs_render = false;
        }

        let first = match rt.block_on(tokio::time::timeout(IDLE_WAIT, rx.recv())) {
            Ok(Some(msg)) => msg,
            Ok(None) => break,
            Err(_) => continue,
        };

        // Drain whatever else is queued so a burst costs one frame.
        let mut next = Some(first);
        while let Some(msg) = next {
            dispatch(&mut app, &handle, runtime, tx, msg);
            next = rx.try_recv().ok();
        }
        needs_render = true;
    }
    Ok(())
}

fn dispatch<R: Runtime>(
    app: &mut App,
    handle: &tokio::runtime::Handle,
    runtime: &Arc<R>,
    tx: &UnboundedSender<Msg>,
    msg: Msg,
) {
    let cmds: Vec<Cmd> = app.update(msg);
    for cmd in cmds {
        perform(handle, runtime, cmd, tx);
    }
}

/// Terminal input is read on a plain thread; crossterm's poll blocks.
fn spawn_input_thread(tx: UnboundedSender<Msg>, should_quit: Arc<AtomicBool>) {
    let quit = Arc::clone(&should_quit);
    let spawned = thread::Builder::new()
        .name("berth-input".into())
        .spawn(move || {
            while !tx.is_closed() && !quit.load(Ordering::Relaxed) {
                match event::poll(IDLE_WAIT) {
                    Ok(false) => continue,
                    Ok(true) => {}
                    Err(err) => {
                        tracing::error!(%err, "terminal poll failed");
                        quit.store(true, Ordering::Relaxed);
                        break;
                    }
                }
                let msg = match event::read() {
                    Ok(event::Event::Key(key)) if key.kind == event::KeyEventKind::Press => Msg::Key(key),
                    Ok(event::Event::Resize(cols, rows)) => Msg::Resize(cols, rows),
                    Ok(_) => continue,
                    Err(err) => {
                        tracing::error!(%err, "terminal read failed");
                        quit.store(true, Ordering::Relaxed);
                        break;
                    }
                };
                if tx.send(msg).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        tracing::error!(%err, "could not start input thread");
        should_quit.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_thread_leaves_when_the_loop_is_gone() {
        let should_quit = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        spawn_input_thread(tx, Arc::clone(&should_quit));

        // The thread drops its clone of the flag on the way out.
        for _ in 0..100 {
            if Arc::strong_count(&should_quit) == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(Arc::strong_count(&should_quit), 1);
        assert!(!should_quit.load(Ordering::Relaxed));
    }
}
