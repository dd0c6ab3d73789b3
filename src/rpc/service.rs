//! `Home` service implementation.
//!
//! A thin façade: every handler converts wire messages to domain types,
//! delegates to the engine or the store, and turns any [`HomeError`] into a
//! `tonic::Status` on the way out.

use super::proto::home_server::Home;
use super::proto::{AcStatus, AcStatusParam, AtmosphereFeatures, AtmosphereReading};
use crate::ac::{self, AcStatusStore};
use crate::atmosphere::{AtmosphereEngine, ConnectionLost, FeatureMask};
use crate::error::HomeError;
use futures_util::Stream;
use log::{debug, info, warn};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tonic::{Request, Response, Status, Streaming};

pub type AtmosphereReadingStream =
    Pin<Box<dyn Stream<Item = Result<AtmosphereReading, Status>> + Send + 'static>>;

#[derive(Clone)]
pub struct HomeService {
    engine: Arc<AtmosphereEngine>,
    store: Arc<AcStatusStore>,
}

impl HomeService {
    pub fn new(engine: Arc<AtmosphereEngine>, store: Arc<AcStatusStore>) -> Self {
        Self { engine, store }
    }
}

#[tonic::async_trait]
impl Home for HomeService {
    type ReadAtmosphereStream = AtmosphereReadingStream;

    async fn read_atmosphere(
        &self,
        request: Request<Streaming<AtmosphereFeatures>>,
    ) -> Result<Response<Self::ReadAtmosphereStream>, Status> {
        let peer = request.remote_addr();
        debug!("[RPC] ReadAtmosphere opened by {:?}", peer);

        // A broken inbound stream is a lost connection, not a client error
        let masks = request.into_inner().map(move |item| match item {
            Ok(features) => Ok(FeatureMask::from(features)),
            Err(status) => {
                debug!("[RPC] ReadAtmosphere inbound from {:?} broke: {}", peer, status);
                Err(ConnectionLost::new(status.message()))
            }
        });

        let readings: Self::ReadAtmosphereStream = Box::pin(
            self.engine
                .open_session(masks)
                .map(|item| item.map(AtmosphereReading::from).map_err(Status::from)),
        );

        Ok(Response::new(readings))
    }

    async fn get_ac_status(
        &self,
        _request: Request<AcStatusParam>,
    ) -> Result<Response<AcStatus>, Status> {
        let status = self.store.get();
        debug!("[RPC] GetAcStatus -> {}", status);
        Ok(Response::new(status.into()))
    }

    async fn set_ac_status(&self, request: Request<AcStatus>) -> Result<Response<AcStatus>, Status> {
        let requested = ac::AcStatus::try_from(request.into_inner()).inspect_err(|e| {
            warn!("[RPC] SetAcStatus rejected: {}", e);
        })?;

        match self.store.set(requested).await {
            Ok(applied) => {
                info!("[RPC] SetAcStatus {} -> {}", requested, applied);
                Ok(Response::new(applied.into()))
            }
            Err(e) => {
                log_set_failure(&requested, &e);
                Err(e.into())
            }
        }
    }
}

fn log_set_failure(requested: &ac::AcStatus, err: &HomeError) {
    if err.is_client_error() {
        warn!("[RPC] SetAcStatus {} rejected: {}", requested, err);
    } else {
        warn!("[RPC] SetAcStatus {} failed: {}", requested, err);
    }
}
