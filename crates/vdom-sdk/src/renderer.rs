use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vdom_diff::{diff_keyed, diff_positional};
use vdom_fiber::{Completion, Priority, Scheduler, SessionHandle};
use vdom_patch::{apply_indexed, apply_patches, mount, HostTree, MemoryHost};
use vdom_types::{Element, HostId, VTree};

use crate::error::{SdkError, SdkResult};

/// Diff strategy used for a render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Key-based diff, reference-addressed replay.
    #[default]
    Keyed,
    /// Position-based diff, index-addressed replay.
    Positional,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyed => write!(f, "keyed"),
            Self::Positional => write!(f, "positional"),
        }
    }
}

impl FromStr for Strategy {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keyed" | "key" => Ok(Self::Keyed),
            "positional" | "position" | "index" => Ok(Self::Positional),
            other => Err(SdkError::UnknownStrategy(other.to_string())),
        }
    }
}

/// What one render did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderSummary {
    pub strategy: Strategy,
    /// Patches applied. A first mount counts as one INSERT.
    pub patches: usize,
    /// Host node of the rendered root.
    pub root: HostId,
}

/// Renders elements into a host tree, reusing host nodes across renders.
pub struct Renderer<H: HostTree> {
    host: H,
    container: HostId,
    tree: Option<VTree>,
    root: Option<HostId>,
}

impl Renderer<MemoryHost> {
    /// A renderer over a fresh [`MemoryHost`] with a container element.
    pub fn in_memory(container_tag: &str) -> Self {
        let mut host = MemoryHost::new();
        let container = host.create_container(container_tag);
        Self::new(host, container)
    }

    /// Markup of everything mounted in the container.
    pub fn markup(&self) -> String {
        self.host.render_children(self.container)
    }
}

impl<H: HostTree> Renderer<H> {
    /// Render into `container`, which must already exist in `host`.
    pub fn new(host: H, container: HostId) -> Self {
        Self {
            host,
            container,
            tree: None,
            root: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn container(&self) -> HostId {
        self.container
    }

    /// The last rendered tree, with host refs bound.
    pub fn tree(&self) -> Option<&VTree> {
        self.tree.as_ref()
    }

    /// Host node of the mounted root.
    pub fn root(&self) -> Option<HostId> {
        self.root
    }

    /// Render `element` with the key-based strategy.
    pub fn render(&mut self, element: Element) -> SdkResult<RenderSummary> {
        self.render_with(element, Strategy::Keyed)
    }

    /// Render `element` with the position-based strategy.
    pub fn render_positional(&mut self, element: Element) -> SdkResult<RenderSummary> {
        self.render_with(element, Strategy::Positional)
    }

    pub fn render_with(&mut self, element: Element, strategy: Strategy) -> SdkResult<RenderSummary> {
        let mut new = VTree::build(element)?;
        let (Some(old), Some(root)) = (self.tree.as_ref(), self.root) else {
            return self.mount(new, strategy);
        };

        let (patches, root) = match strategy {
            Strategy::Keyed => {
                let patches = diff_keyed(Some(old), &mut new)?;
                let report = apply_patches(&mut self.host, old, &mut new, &patches)?;
                (patches.len(), report.root.unwrap_or(root))
            }
            Strategy::Positional => {
                let patches = diff_positional(old, &mut new)?;
                let report = apply_indexed(&mut self.host, root, &mut new, &patches)?;
                (patches.len(), report.root)
            }
        };

        debug!(%strategy, patches, nodes = new.len(), "render applied");
        self.tree = Some(new);
        self.root = Some(root);
        Ok(RenderSummary {
            strategy,
            patches,
            root,
        })
    }

    /// Schedule a time-sliced diff of `element` against the current tree.
    ///
    /// The scheduler only computes patches. Pass the [`Completion`] the
    /// callback receives to [`commit`](Self::commit) to apply them.
    pub fn schedule<F>(
        &self,
        scheduler: &Scheduler,
        element: Element,
        priority: Priority,
        callback: F,
    ) -> SdkResult<SessionHandle>
    where
        F: FnOnce(vdom_diff::DiffResult<Completion>) + Send + 'static,
    {
        let new = VTree::build(element)?;
        Ok(scheduler.schedule(self.container, self.tree.clone(), new, priority, callback))
    }

    /// Apply the patches of a scheduled diff.
    ///
    /// Fails with [`SdkError::StaleCompletion`] when the renderer rendered
    /// something else after the diff was scheduled.
    pub fn commit(&mut self, completion: Completion) -> SdkResult<RenderSummary> {
        if completion.old != self.tree {
            return Err(SdkError::StaleCompletion(completion.session));
        }
        let Completion {
            session,
            patches,
            old,
            mut new,
            ..
        } = completion;

        let (Some(old), Some(root)) = (old, self.root) else {
            return self.mount(new, Strategy::Keyed);
        };
        let report = apply_patches(&mut self.host, &old, &mut new, &patches)?;
        let root = report.root.unwrap_or(root);

        info!(%session, patches = patches.len(), "scheduled render committed");
        self.tree = Some(new);
        self.root = Some(root);
        Ok(RenderSummary {
            strategy: Strategy::Keyed,
            patches: patches.len(),
            root,
        })
    }

    /// Detach the mounted tree from the container.
    pub fn unmount(&mut self) -> SdkResult<()> {
        let root = self.root.take().ok_or(SdkError::NotMounted)?;
        self.tree = None;
        self.host
            .remove_child(self.container, root)
            .map_err(vdom_patch::ApplyError::from)?;
        Ok(())
    }

    fn mount(&mut self, mut tree: VTree, strategy: Strategy) -> SdkResult<RenderSummary> {
        let root = mount(&mut self.host, self.container, &mut tree)?;
        debug!(%strategy, nodes = tree.len(), "tree mounted");
        self.tree = Some(tree);
        self.root = Some(root);
        Ok(RenderSummary {
            strategy,
            patches: 1,
            root,
        })
    }
}
