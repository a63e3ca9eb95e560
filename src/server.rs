use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use strum::AsRefStr;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum State {
    #[strum(serialize = "stopped")]
    Stopped,
    #[strum(serialize = "running")]
    Running,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.as_ref(), f)
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    StateUpdated(State),
    Error(String),
}

/// Owns the listener lifecycle: stopped -> running -> stopped. Transitions
/// and failures are broadcast to subscribers; `stop` shuts the listener
/// down gracefully and the serve task's exit path returns the state to
/// stopped.
pub struct Server {
    port: u16,
    router: Router,
    inner: Mutex<Inner>,
    events: broadcast::Sender<Event>,
}

struct Inner {
    state: State,
    handle: Option<axum_server::Handle>,
}

impl Server {
    pub fn new(port: u16, router: Router) -> Server {
        let (events, _) = broadcast::channel(16);

        Server {
            port,
            router,
            inner: Mutex::new(Inner {
                state: State::Stopped,
                handle: None,
            }),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn state(&self) -> State {
        self.inner.lock().unwrap().state
    }

    pub fn start(self: &Arc<Self>) {
        let handle = axum_server::Handle::new();

        let already_running = {
            let mut inner = self.inner.lock().unwrap();

            if inner.state == State::Running {
                true
            } else {
                inner.state = State::Running;
                inner.handle = Some(handle.clone());
                false
            }
        };

        if already_running {
            self.emit(Event::Error(String::from("already-running")));

            return;
        }

        self.emit(Event::StateUpdated(State::Running));

        let this = Arc::clone(self);

        tokio::spawn(async move {
            this.run(handle).await;
        });
    }

    pub fn stop(&self) {
        let handle = {
            let inner = self.inner.lock().unwrap();

            inner.handle.clone()
        };

        match handle {
            Some(handle) => handle.graceful_shutdown(None),
            None => self.emit(Event::Error(String::from("not-running")))
        }
    }

    async fn run(self: Arc<Self>, handle: axum_server::Handle) {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));

        match bind(addr) {
            Ok(listener) => {
                match listener.local_addr() {
                    Ok(local) => {
                        tracing::info!("tcp socket listener: {local}");
                    }
                    Err(err) => {
                        tracing::error!("failed to retrieve tcp listener address: {err}");
                    }
                }

                let fut = axum_server::from_tcp(listener)
                    .handle(handle)
                    .serve(self.router.clone().into_make_service());

                if let Err(err) = fut.await {
                    self.emit(Event::Error(err.to_string()));
                }
            }
            Err(err) => {
                self.emit(Event::Error(err.to_string()));
            }
        }

        {
            let mut inner = self.inner.lock().unwrap();
            inner.handle = None;
            inner.state = State::Stopped;
        }

        self.emit(Event::StateUpdated(State::Stopped));
    }

    fn emit(&self, event: Event) {
        let _ = self.events.send(event);
    }
}

fn bind(addr: SocketAddr) -> std::io::Result<std::net::TcpListener> {
    let listener = std::net::TcpListener::bind(addr)?;

    listener.set_nonblocking(true)?;

    Ok(listener)
}
