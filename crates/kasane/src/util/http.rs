use std::{ops::Deref, time::Duration};

use fake_user_agent::get_chrome_rua;
use reqwest::{Client, ClientBuilder};

use crate::KasaneResult;

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(builder: ClientBuilder) -> KasaneResult<Self> {
        let client = builder.build()?;
        Ok(Self { client })
    }

    /// Chrome user agent with a request timeout, which is what segment CDNs expect.
    pub fn with_timeout(timeout: Duration) -> KasaneResult<Self> {
        Self::new(
            Client::builder()
                .user_agent(get_chrome_rua())
                .timeout(timeout),
        )
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        let client = Client::builder()
            .user_agent(get_chrome_rua())
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

impl Deref for HttpClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}
