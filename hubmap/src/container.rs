//! Mount points the map widget is attached to.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::controller::InstanceId;

static CONTAINER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Stable identity of a container for the lifetime of one initialize/teardown pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u64);

impl ContainerId {
    /// Returns a new process-unique id.
    pub fn next() -> Self {
        Self(CONTAINER_COUNTER.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Size of a container in pixels. Either side may be zero while the host is still mounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ContainerSize {
    /// Creates a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if the container covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Single-shot notification that a container became renderable.
///
/// Obtained from [`ContainerHost::ready_signal`]. Dropping the signal cancels the wait; the
/// host side simply finds nobody listening.
#[derive(Debug)]
pub struct ReadySignal {
    receiver: oneshot::Receiver<()>,
}

/// State of a [`ReadySignal`] at the moment it is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Host has not reported readiness yet.
    Waiting,
    /// Host reported the container as ready.
    Ready,
    /// Host discarded the container without it ever becoming ready.
    Discarded,
}

impl ReadySignal {
    /// Creates a connected notifier/signal pair.
    pub fn channel() -> (ReadyNotifier, ReadySignal) {
        let (sender, receiver) = oneshot::channel();
        (ReadyNotifier { sender }, ReadySignal { receiver })
    }

    /// Checks the signal without blocking.
    pub fn poll(&mut self) -> ReadyState {
        match self.receiver.try_recv() {
            Ok(()) => ReadyState::Ready,
            Err(oneshot::error::TryRecvError::Empty) => ReadyState::Waiting,
            Err(oneshot::error::TryRecvError::Closed) => ReadyState::Discarded,
        }
    }

    /// Waits until the host reports readiness. Returns false if the container was discarded.
    pub async fn wait(self) -> bool {
        self.receiver.await.is_ok()
    }
}

/// Host side of a [`ReadySignal`].
#[derive(Debug)]
pub struct ReadyNotifier {
    sender: oneshot::Sender<()>,
}

impl ReadyNotifier {
    /// Reports readiness. Returns false if nobody is waiting anymore.
    pub fn notify(self) -> bool {
        self.sender.send(()).is_ok()
    }
}

/// Mount point supplied by the hosting page.
///
/// Besides its geometry the container carries a binding slot, so that two controllers never
/// attach widgets to the same surface.
pub trait ContainerHost: Send + Sync {
    /// Identity of the container.
    fn id(&self) -> ContainerId;

    /// Current size of the container.
    fn size(&self) -> ContainerSize;

    /// Returns true if the container is attached to a rendering surface.
    fn is_attached(&self) -> bool;

    /// Instance currently bound to the container.
    fn bound_instance(&self) -> Option<InstanceId>;

    /// Sets or clears the bound instance.
    fn set_bound_instance(&self, instance: Option<InstanceId>);

    /// Returns a signal that fires once the container becomes renderable.
    fn ready_signal(&self) -> ReadySignal;

    /// Returns true if a widget can be created in the container right now.
    fn is_renderable(&self) -> bool {
        self.is_attached() && !self.size().is_empty()
    }
}

#[derive(Debug, Default)]
struct MountState {
    attached: bool,
    size: ContainerSize,
    bound: Option<InstanceId>,
    waiting: Vec<ReadyNotifier>,
}

/// Stock [`ContainerHost`] implementation driven by the hosting page.
///
/// A mount point starts detached. The host calls [`MountPoint::attach`] once layout has produced
/// a non-empty rectangle, which fires all pending ready signals.
#[derive(Debug)]
pub struct MountPoint {
    id: ContainerId,
    state: Mutex<MountState>,
}

impl MountPoint {
    /// Creates a detached mount point with a fresh id.
    pub fn new() -> Self {
        Self {
            id: ContainerId::next(),
            state: Mutex::new(MountState::default()),
        }
    }

    /// Creates a mount point that is already attached with the given size.
    pub fn attached(size: ContainerSize) -> Self {
        let mount = Self::new();
        mount.attach(size);
        mount
    }

    /// Attaches the container to the surface with the given size.
    ///
    /// Ready signals fire only if the size is not empty; otherwise they keep waiting for a later
    /// attach or resize.
    pub fn attach(&self, size: ContainerSize) {
        let mut state = self.state.lock();
        state.attached = true;
        state.size = size;
        Self::notify_if_ready(&mut state);
    }

    /// Changes the size of the container.
    pub fn resize(&self, size: ContainerSize) {
        let mut state = self.state.lock();
        state.size = size;
        Self::notify_if_ready(&mut state);
    }

    /// Detaches the container. Outstanding ready signals observe the container as discarded.
    pub fn detach(&self) {
        let mut state = self.state.lock();
        state.attached = false;
        state.waiting.clear();
    }

    fn notify_if_ready(state: &mut MountState) {
        if !state.attached || state.size.is_empty() {
            return;
        }

        for notifier in state.waiting.drain(..) {
            notifier.notify();
        }
    }
}

impl Default for MountPoint {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerHost for MountPoint {
    fn id(&self) -> ContainerId {
        self.id
    }

    fn size(&self) -> ContainerSize {
        self.state.lock().size
    }

    fn is_attached(&self) -> bool {
        self.state.lock().attached
    }

    fn bound_instance(&self) -> Option<InstanceId> {
        self.state.lock().bound
    }

    fn set_bound_instance(&self, instance: Option<InstanceId>) {
        self.state.lock().bound = instance;
    }

    fn ready_signal(&self) -> ReadySignal {
        let (notifier, signal) = ReadySignal::channel();
        let mut state = self.state.lock();
        if state.attached && !state.size.is_empty() {
            notifier.notify();
        } else {
            state.waiting.push(notifier);
        }

        signal
    }
}
