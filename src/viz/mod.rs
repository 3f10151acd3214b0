//! Lifecycle of rendered chart instances.
//!
//! Every regeneration unmounts all instances and mounts the new chart list;
//! instances are never reused across regenerations, even for identical ids.

pub mod resize;
pub mod theme;

use crate::models::ChartDescriptor;
use resize::ResizeDebouncer;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Low-level chart drawing primitives supplied by the host.
pub trait RenderSurface {
    type Instance;

    fn init(&mut self, container: &str, options: &Value) -> Result<Self::Instance, RenderError>;

    /// Re-layout the instance to its container's current size.
    fn resize(&mut self, instance: &mut Self::Instance);

    fn dispose(&mut self, instance: Self::Instance);
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Render init failed: {0}")]
    Init(String),
    #[error("Unknown chart handle: {0}")]
    UnknownHandle(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChartHandle(u64);

struct Mounted<I> {
    container: String,
    chart_id: String,
    instance: I,
}

pub struct VisualizationAdapter<S: RenderSurface> {
    surface: S,
    mounted: BTreeMap<u64, Mounted<S::Instance>>,
    next_handle: u64,
    resizes: ResizeDebouncer,
}

impl<S: RenderSurface> VisualizationAdapter<S> {
    pub fn new(surface: S, resize_delay: Duration) -> Self {
        Self {
            surface,
            mounted: BTreeMap::new(),
            next_handle: 1,
            resizes: ResizeDebouncer::new(resize_delay),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }

    pub fn handle_for(&self, container: &str) -> Option<ChartHandle> {
        self.mounted
            .iter()
            .find(|(_, m)| m.container == container)
            .map(|(h, _)| ChartHandle(*h))
    }

    pub fn chart_id(&self, handle: ChartHandle) -> Option<&str> {
        self.mounted.get(&handle.0).map(|m| m.chart_id.as_str())
    }

    /// Render `chart` into `container`. A container holds at most one
    /// instance; whatever was there before is disposed first.
    pub fn mount(
        &mut self,
        container: &str,
        chart: &ChartDescriptor,
    ) -> Result<ChartHandle, RenderError> {
        if let Some(previous) = self.handle_for(container) {
            self.unmount(previous)?;
        }

        let options = theme::apply_theme(&chart.render_config);
        let instance = self.surface.init(container, &options)?;

        let handle = self.next_handle;
        self.next_handle += 1;
        self.mounted.insert(
            handle,
            Mounted {
                container: container.to_string(),
                chart_id: chart.id.clone(),
                instance,
            },
        );
        tracing::debug!(handle, container, chart_id = %chart.id, "chart mounted");
        Ok(ChartHandle(handle))
    }

    pub fn unmount(&mut self, handle: ChartHandle) -> Result<(), RenderError> {
        let mounted = self
            .mounted
            .remove(&handle.0)
            .ok_or(RenderError::UnknownHandle(handle.0))?;
        self.resizes.cancel(handle.0);
        self.surface.dispose(mounted.instance);
        tracing::debug!(handle = handle.0, container = %mounted.container, "chart unmounted");
        Ok(())
    }

    pub fn unmount_all(&mut self) {
        self.resizes.clear();
        let mounted = std::mem::take(&mut self.mounted);
        for (_, m) in mounted {
            self.surface.dispose(m.instance);
        }
    }

    /// Unmount everything, then mount `charts` into containers named by their
    /// layout keys. A chart that fails to initialize is skipped and logged.
    pub fn remount_all(&mut self, charts: &[ChartDescriptor]) -> Vec<ChartHandle> {
        self.unmount_all();
        charts
            .iter()
            .filter_map(|chart| match self.mount(&chart.layout_key(), chart) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!(chart_id = %chart.id, error = %e, "chart failed to render");
                    None
                }
            })
            .collect()
    }

    /// The host saw `container` change size.
    pub fn notify_resize(&mut self, container: &str, now: Instant) {
        match self.handle_for(container) {
            Some(handle) => self.resizes.notify(handle.0, now),
            None => tracing::warn!(container, "resize for container with no mounted chart"),
        }
    }

    pub fn notify_resize_all(&mut self, now: Instant) {
        let handles: Vec<u64> = self.mounted.keys().copied().collect();
        for handle in handles {
            self.resizes.notify(handle, now);
        }
    }

    /// Re-layout every instance whose debounce window has closed.
    pub fn flush_resizes(&mut self, now: Instant) -> usize {
        let mut count = 0;
        for handle in self.resizes.take_due(now) {
            if let Some(m) = self.mounted.get_mut(&handle) {
                self.surface.resize(&mut m.instance);
                count += 1;
            }
        }
        count
    }

    pub fn next_resize_deadline(&self) -> Option<Instant> {
        self.resizes.next_deadline()
    }
}

impl<S: RenderSurface> Drop for VisualizationAdapter<S> {
    fn drop(&mut self) {
        self.unmount_all();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSurface;
    use super::*;
    use crate::models::ChartType;
    use serde_json::json;

    fn adapter() -> VisualizationAdapter<RecordingSurface> {
        VisualizationAdapter::new(RecordingSurface::default(), Duration::from_millis(100))
    }

    fn chart(id: &str) -> ChartDescriptor {
        ChartDescriptor::new(id, ChartType::Bar, json!({"title": {"text": id}}))
    }

    #[test]
    fn test_mount_applies_theme_without_touching_chart() {
        let mut viz = adapter();
        let c = chart("1");
        viz.mount("chart-1", &c).unwrap();
        let (container, options) = &viz.surface().inits[0];
        assert_eq!(container, "chart-1");
        assert!(options["tooltip"].is_object());
        assert!(c.render_config.get("tooltip").is_none());
    }

    #[test]
    fn test_one_instance_per_container() {
        let mut viz = adapter();
        viz.mount("slot", &chart("1")).unwrap();
        viz.mount("slot", &chart("2")).unwrap();
        assert_eq!(viz.mounted_count(), 1);
        assert_eq!(viz.surface().live.len(), 1);
        assert_eq!(viz.surface().disposed, vec![1]);
    }

    #[test]
    fn test_remount_rebuilds_identical_charts() {
        let mut viz = adapter();
        let charts = vec![chart("1"), chart("2")];
        viz.remount_all(&charts);
        let handles = viz.remount_all(&charts);
        assert_eq!(handles.len(), 2);
        assert_eq!(viz.surface().inits.len(), 4);
        assert_eq!(viz.surface().disposed.len(), 2);
        assert_eq!(viz.surface().live.len(), 2);
        assert_eq!(viz.chart_id(handles[1]), Some("2"));
    }

    #[test]
    fn test_failed_init_is_skipped() {
        let mut viz = adapter();
        let mut surface = RecordingSurface::default();
        surface.fail_containers.push("chart-2".into());
        viz.surface = surface;
        let handles = viz.remount_all(&[chart("1"), chart("2"), chart("3")]);
        assert_eq!(handles.len(), 2);
        assert!(viz.handle_for("chart-2").is_none());
    }

    #[test]
    fn test_unmount_unknown_handle_errors() {
        let mut viz = adapter();
        let handle = viz.mount("chart-1", &chart("1")).unwrap();
        viz.unmount(handle).unwrap();
        assert!(matches!(viz.unmount(handle), Err(RenderError::UnknownHandle(_))));
    }

    #[test]
    fn test_resize_debounced_per_instance() {
        let mut viz = adapter();
        viz.remount_all(&[chart("1"), chart("2")]);
        let t0 = Instant::now();
        for ms in [0, 20, 40, 60] {
            viz.notify_resize("chart-1", t0 + Duration::from_millis(ms));
        }
        assert_eq!(viz.flush_resizes(t0 + Duration::from_millis(120)), 0);
        assert_eq!(viz.flush_resizes(t0 + Duration::from_millis(160)), 1);
        assert_eq!(viz.surface().resized.len(), 1);
    }

    #[test]
    fn test_unmounted_instances_get_no_resize() {
        let mut viz = adapter();
        viz.remount_all(&[chart("1")]);
        let t0 = Instant::now();
        viz.notify_resize_all(t0);
        viz.remount_all(&[chart("9")]);
        viz.notify_resize("chart-1", t0);
        assert_eq!(viz.flush_resizes(t0 + Duration::from_secs(1)), 0);
        assert!(viz.surface().resized.is_empty());
    }

    #[test]
    fn test_drop_disposes_everything() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct Counting(Rc<RefCell<usize>>);
        impl RenderSurface for Counting {
            type Instance = ();
            fn init(&mut self, _: &str, _: &Value) -> Result<(), RenderError> {
                Ok(())
            }
            fn resize(&mut self, _: &mut ()) {}
            fn dispose(&mut self, _: ()) {
                *self.0.borrow_mut() += 1;
            }
        }

        let disposed = Rc::new(RefCell::new(0));
        {
            let mut viz = VisualizationAdapter::new(Counting(disposed.clone()), Duration::ZERO);
            viz.remount_all(&[chart("1"), chart("2"), chart("3")]);
        }
        assert_eq!(*disposed.borrow(), 3);
    }
}
