use crate::display::model::DisplayModel;
use anyhow::Context;
use seisfeed::connection::Diagnostic;
use seisfeed::Snapshot;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};
use warp::Filter;

/// Holds the display model fed by the connection manager and exposes it to
/// an external chart renderer.
pub struct DisplayBridge {
    state: Arc<RwLock<DisplayModel>>,
}

impl DisplayBridge {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(DisplayModel::default())),
        }
    }

    /// Serves `GET /snapshot` on `addr`. Must be called inside a tokio runtime.
    pub fn serve(&self, addr: SocketAddr) -> anyhow::Result<SocketAddr> {
        let state = self.state.clone();
        let state_filter = warp::any().map(move || state.clone());

        let snapshot_route = warp::path("snapshot")
            .and(warp::get())
            .and(state_filter)
            .map(|state: Arc<RwLock<DisplayModel>>| {
                let model = state.read().unwrap_or_else(PoisonError::into_inner);
                warp::reply::json(&*model)
            });

        let (bound, server) = warp::serve(snapshot_route)
            .try_bind_ephemeral(addr)
            .with_context(|| format!("binding display endpoint on {addr}"))?;
        tokio::spawn(server);
        self.publish_status(&format!("serving snapshots on http://{bound}/snapshot"));
        Ok(bound)
    }

    pub fn publish(&self, snapshot: &Snapshot) {
        let mut model = self.state.write().unwrap_or_else(PoisonError::into_inner);
        model.apply(snapshot);
        println!(
            "[FEED] {} | station {} | {} samples | {} mag {} p-arrival {}",
            model.connection_label,
            model.station_label,
            model.rows.len(),
            model.status,
            model.magnitude,
            model.p_arrival
        );
    }

    pub fn publish_diagnostic(&self, diagnostic: &Diagnostic) {
        let entry = diagnostic.to_string();
        println!("[FEED] diagnostic: {}", entry);
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push_diagnostic(entry);
    }

    pub fn publish_status(&self, message: &str) {
        println!("[FEED] {}", message);
    }

    pub fn snapshot(&self) -> DisplayModel {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for DisplayBridge {
    fn default() -> Self {
        Self::new()
    }
}
