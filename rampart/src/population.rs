use crate::executor::Target;
use crate::virtual_user::{VirtualUser, VuContext};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// The live set of virtual users, grown and shrunk to follow the ramp.
///
/// Retired users are kept aside until their task finishes, so shrinking never waits on an
/// in-flight request.
pub(crate) struct Population<T> {
    ctx: VuContext<T>,
    live: Vec<VirtualUser>,
    retiring: Vec<VirtualUser>,
    next_id: usize,
}

impl<T> Population<T>
where
    T: Target + Send + Sync + 'static,
{
    pub fn new(ctx: VuContext<T>) -> Self {
        Self {
            ctx,
            live: vec![],
            retiring: vec![],
            next_id: 0,
        }
    }

    pub fn set_concurrency(&mut self, concurrency: usize) {
        self.retiring.retain(|vu| !vu.is_finished());

        if self.live.len() == concurrency {
            return;
        }

        debug!(
            from = self.live.len(),
            to = concurrency,
            retiring = self.retiring.len(),
            "Adjusting virtual users"
        );

        if self.live.len() > concurrency {
            // Newest users retire first.
            for vu in self.live.drain(concurrency..) {
                vu.retire();
                self.retiring.push(vu);
            }
        } else {
            while self.live.len() < concurrency {
                let vu = VirtualUser::spawn(self.next_id, self.ctx.clone());
                self.next_id += 1;
                self.live.push(vu);
            }
        }
    }

    pub fn concurrency(&self) -> usize {
        self.live.len()
    }

    pub fn spawned(&self) -> usize {
        self.next_id
    }

    /// Retires everyone and waits for the last in-flight requests to be recorded.
    pub async fn shutdown(mut self) {
        self.set_concurrency(0);
        for vu in self.retiring.drain(..) {
            vu.join().await;
        }
    }
}
