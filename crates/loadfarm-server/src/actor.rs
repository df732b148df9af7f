use std::fmt::Display;
use std::future::Future;

use log::{error, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

const ACTOR_CHANNEL_SIZE: usize = 8;

#[async_trait::async_trait]
pub trait Actor: Sized + Send + 'static {
    type Message: Send + 'static;
    type Options: Send + 'static;

    fn new(options: Self::Options) -> Self;
    async fn start(&mut self, ctx: &mut ActorContext<Self>);
    fn receive(&mut self, ctx: &mut ActorContext<Self>, message: Self::Message) -> ActorAction;
    async fn stop(self, ctx: &mut ActorContext<Self>);
}

pub enum ActorAction {
    Continue,
    Stop,
    Fail(String),
}

impl ActorAction {
    pub fn fail(error: impl Display) -> Self {
        ActorAction::Fail(error.to_string())
    }
}

/// The context available to an actor when it handles a message.
/// Tasks spawned via the context are aborted when the actor stops.
pub struct ActorContext<T: Actor> {
    handle: ActorHandle<T>,
    tasks: JoinSet<()>,
}

impl<T: Actor> ActorContext<T> {
    fn new(handle: ActorHandle<T>) -> Self {
        Self {
            handle,
            tasks: JoinSet::new(),
        }
    }

    pub fn handle(&self) -> &ActorHandle<T> {
        &self.handle
    }

    pub fn spawn(&mut self, f: impl Future<Output = ()> + Send + 'static) {
        self.tasks.spawn(f);
    }

    /// Sends a message to the actor itself without blocking the message loop.
    pub fn send(&mut self, message: T::Message) {
        let handle = self.handle.clone();
        self.spawn(async move {
            if handle.send(message).await.is_err() {
                warn!("failed to send message to the actor itself");
            }
        });
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                if e.is_panic() {
                    error!("actor task panicked: {e}");
                }
            }
        }
    }

    async fn shutdown(&mut self) {
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
    }
}

pub struct ActorHandle<T>
where
    T: Actor,
{
    sender: mpsc::Sender<T::Message>,
    stopped: watch::Receiver<bool>,
}

impl<T> Clone for ActorHandle<T>
where
    T: Actor,
{
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            stopped: self.stopped.clone(),
        }
    }
}

impl<T: Actor> ActorHandle<T> {
    pub fn new(options: T::Options) -> Self {
        let (handle, runner) = Self::prepare(options);
        tokio::spawn(runner);
        handle
    }

    fn prepare(options: T::Options) -> (Self, impl Future<Output = ()> + Send + 'static) {
        let (tx, mut rx) = mpsc::channel(ACTOR_CHANNEL_SIZE);
        let (stopped_tx, stopped_rx) = watch::channel::<bool>(false);
        let mut actor = T::new(options);
        let out = Self {
            sender: tx,
            stopped: stopped_rx,
        };
        let mut ctx = ActorContext::new(out.clone());
        let runner = async move {
            actor.start(&mut ctx).await;
            while let Some(message) = rx.recv().await {
                ctx.reap();
                match actor.receive(&mut ctx, message) {
                    ActorAction::Continue => {}
                    ActorAction::Stop => break,
                    ActorAction::Fail(e) => {
                        error!("actor failed: {e}");
                        break;
                    }
                }
            }
            actor.stop(&mut ctx).await;
            ctx.shutdown().await;
            let _ = stopped_tx.send(true);
        };
        (out, runner)
    }

    pub async fn send(
        &self,
        message: T::Message,
    ) -> Result<(), mpsc::error::SendError<T::Message>> {
        self.sender.send(message).await
    }

    pub async fn wait_for_stop(mut self) {
        // We ignore the receiver error since the sender must have been dropped in this case,
        // which means the actor has stopped.
        let _ = self.stopped.wait_for(|x| *x).await;
    }
}

/// Owns the message loops of a group of actors so that they can be joined together.
#[derive(Default)]
pub struct ActorSystem {
    runners: JoinSet<()>,
}

impl ActorSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<T: Actor>(&mut self, options: T::Options) -> ActorHandle<T> {
        let (handle, runner) = ActorHandle::<T>::prepare(options);
        self.runners.spawn(runner);
        handle
    }

    pub async fn join(&mut self) {
        while let Some(result) = self.runners.join_next().await {
            if let Err(e) = result {
                error!("actor runner failed: {e}");
            }
        }
    }
}
