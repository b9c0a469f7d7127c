//! Discovery Pipeline (C5): runs the Finder once and seeds the Work Pool.
//!
//! When an `attribute_root` is given the Finder is bypassed entirely —
//! the single root path is inserted and submitted directly, and the
//! Describer's own recursive edge output exposes the rest of the graph.

use std::sync::Arc;

use tracing::debug;

use crate::describe_pipeline::{describe_one, PipelineContext};
use crate::error::Error;
use crate::model::AttributePath;
use crate::status::StatusEvent;

/// Seed the pool from an explicit attribute root, bypassing the Finder.
pub fn seed_from_root<'scope>(
    scope: &rayon::Scope<'scope>,
    ctx: Arc<PipelineContext>,
    attribute_root: AttributePath,
) {
    if ctx.visited.try_insert(attribute_root.clone()) {
        ctx.status.emit(StatusEvent::Queued(attribute_root.clone()));
        scope.spawn(move |s| describe_one(s, ctx, attribute_root));
    }
}

/// Start the Finder and, for each discovery it yields, `try_insert` into
/// the Visited Set and `submit` newly-seen paths as pool tasks. Runs as
/// one of the pool's own scoped tasks (the "dedicated reader task" of
/// §4.5), so the scope's implicit join also waits for the Finder to
/// finish draining before the run can be considered complete.
///
/// Returns the Finder's terminal `Result` via `on_finder_done` once its
/// stream has ended — a fatal Finder failure (bad flake ref, spawn
/// failure) is reported there for the caller to propagate.
///
/// Takes `ctx` by reference only to spawn the Finder itself (avoiding a
/// second `Arc` clone just for that); the task spawned onto `scope` takes
/// its own clone, so the Finder's lifetime here never needs to outlive
/// the scope on its own — the `Arc` inside does.
pub fn run_discovery<'scope>(
    scope: &rayon::Scope<'scope>,
    ctx: Arc<PipelineContext>,
    on_finder_done: impl FnOnce(Result<(), Error>) + Send + 'scope,
) {
    let (rx, handle) = ctx.driver.run_finder();

    scope.spawn(move |s| {
        for found in rx {
            let path = found.attribute_path;
            if ctx.should_skip(&path) {
                continue;
            }
            if ctx.visited.try_insert(path.clone()) {
                ctx.status.emit(StatusEvent::Queued(path.clone()));
                let child_ctx = Arc::clone(&ctx);
                let child_path = path.clone();
                s.spawn(move |s2| describe_one(s2, child_ctx, child_path));
            }
            debug!(%path, "discovery pipeline saw finder entry");
        }

        let result = handle.join().unwrap_or_else(|_| {
            Err(Error::Spawn {
                program: "nix".to_string(),
                source: std::io::Error::other("finder reader thread panicked"),
            })
        });
        ctx.status.emit(StatusEvent::FinderDone);
        on_finder_done(result);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visited::VisitedSet;

    #[test]
    fn visited_set_accepts_a_root_exactly_once() {
        // `seed_from_root`'s scheduling decision hinges entirely on this:
        // the full subprocess-spawning path is covered by the
        // hermetic-`nix`-stand-in integration tests instead.
        let visited = VisitedSet::new();
        let root = AttributePath::from("default");
        assert!(visited.try_insert(root.clone()));
        assert!(!visited.try_insert(root));
    }
}
