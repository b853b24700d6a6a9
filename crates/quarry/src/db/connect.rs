use crate::Result;

use quarry_core::{
    async_trait,
    driver::{Capability, Connection, Driver},
    Dialect,
};

use url::Url;

/// Driver selected by the scheme of a connection URL.
#[derive(Debug)]
pub struct Connect {
    driver: Box<dyn Driver>,
}

impl Connect {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(anyhow::Error::from)?;

        let driver = match url.scheme() {
            "postgresql" | "postgres" => connect_postgresql(&url)?,
            "sqlite" => connect_sqlite(&url)?,
            scheme => {
                return Err(anyhow::anyhow!("unsupported database; scheme={scheme}; url={url}").into())
            }
        };

        Ok(Self { driver })
    }
}

#[async_trait]
impl Driver for Connect {
    fn dialect(&self) -> Dialect {
        self.driver.dialect()
    }

    fn capability(&self) -> &'static Capability {
        self.driver.capability()
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        self.driver.connect().await
    }

    fn max_connections(&self) -> Option<usize> {
        self.driver.max_connections()
    }
}

#[cfg(feature = "postgresql")]
fn connect_postgresql(url: &Url) -> Result<Box<dyn Driver>> {
    Ok(Box::new(quarry_driver_postgresql::PostgreSQL::new(url)?))
}

#[cfg(not(feature = "postgresql"))]
fn connect_postgresql(_url: &Url) -> Result<Box<dyn Driver>> {
    Err(anyhow::anyhow!("`postgresql` feature not enabled").into())
}

#[cfg(feature = "sqlite")]
fn connect_sqlite(url: &Url) -> Result<Box<dyn Driver>> {
    Ok(Box::new(quarry_driver_sqlite::Sqlite::new(url)?))
}

#[cfg(not(feature = "sqlite"))]
fn connect_sqlite(_url: &Url) -> Result<Box<dyn Driver>> {
    Err(anyhow::anyhow!("`sqlite` feature not enabled").into())
}
