use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use strand_http::server::{HttpServer, ServerHandle, ServerSettings};
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

use crate::{ServerBuildError, UrlRouter};

#[derive(Debug)]
pub struct ServerBuilder {
    router: Option<UrlRouter>,
    addresses: Vec<SocketAddr>,
    address_error: Option<io::Error>,
    settings: ServerSettings,
    virtual_hosts: Vec<(String, UrlRouter)>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: None, addresses: Vec::new(), address_error: None, settings: ServerSettings::new(), virtual_hosts: Vec::new() }
    }

    /// Adds addresses to listen on; without any, the bind addresses and port
    /// of the settings are used.
    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        match address.to_socket_addrs() {
            Ok(addresses) => self.addresses.extend(addresses),
            Err(e) => self.address_error = Some(e),
        }
        self
    }

    /// The router of the default host.
    pub fn router(mut self, router: UrlRouter) -> Self {
        self.router = Some(router);
        self
    }

    pub fn settings(mut self, settings: ServerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Serves requests for `host_name` with their own router, on the same addresses.
    pub fn virtual_host<S: Into<String>>(mut self, host_name: S, router: UrlRouter) -> Self {
        self.virtual_hosts.push((host_name.into(), router));
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        if let Some(e) = self.address_error {
            return Err(e.into());
        }
        let mut router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        router.rebuild();
        let router = Arc::new(router);

        let virtual_hosts = self
            .virtual_hosts
            .into_iter()
            .map(|(host_name, mut router)| {
                router.rebuild();
                (host_name, Arc::new(router))
            })
            .collect::<Vec<_>>();

        let bindings = if self.addresses.is_empty() {
            vec![self.settings]
        } else {
            self.addresses
                .iter()
                .map(|address| {
                    let mut settings = self.settings.clone();
                    settings.bind_addresses = vec![address.ip()];
                    settings.port = address.port();
                    settings
                })
                .collect()
        };

        let mut http_server = HttpServer::new();
        for settings in bindings {
            // the first host of a listener answers requests for unknown hosts
            http_server.listen(settings.clone(), Arc::clone(&router));
            for (host_name, router) in &virtual_hosts {
                debug!(host_name = %host_name, port = settings.port, "virtual host added");
                http_server.listen(settings.clone().with_host_name(host_name.as_str()), Arc::clone(router));
            }
        }

        Ok(Server { http_server })
    }
}

#[derive(Debug)]
pub struct Server {
    http_server: HttpServer,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Installs the global tracing subscriber and starts listening.
    pub async fn start(self) -> io::Result<ServerHandle> {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            debug!("global tracing subscriber already set");
        }
        self.http_server.start().await
    }

    /// Serves until every listener stopped.
    pub async fn run(self) -> io::Result<()> {
        self.start().await?.wait().await;
        Ok(())
    }
}
