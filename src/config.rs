//! Run configuration.
//!
//! There is no configuration file. Everything is resolved from the home directory (the working
//! directory by default) and the command line: CSV inputs live in `$INVENTORY_HOME/data`, logs in
//! `$INVENTORY_HOME/logs` and the store in `$INVENTORY_HOME/inventory.db`.

use crate::db::Db;
use crate::{utils, Result};
use anyhow::Context;
use std::path::{Path, PathBuf};

const DATA: &str = "data";
const LOGS: &str = "logs";
const INVENTORY_DB: &str = "inventory.db";

/// The `Config` object represents the resolved paths of a run along with the open store. It is
/// built once at start-up and handed to each command.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    data_dir: PathBuf,
    logs_dir: PathBuf,
    db: Db,
}

impl Config {
    /// This will
    /// - create `home` if it does not exist, along with its `data` and `logs` directories
    /// - open (or create) the SQLite store
    /// - return the loaded configuration object
    ///
    /// `data_dir`, when given, replaces `$INVENTORY_HOME/data` as the place CSV files are read
    /// from. It is not created.
    pub async fn load(home: impl Into<PathBuf>, data_dir: Option<&Path>) -> Result<Self> {
        let maybe_relative = home.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let logs_dir = root.join(LOGS);
        utils::make_dir(&logs_dir).await?;

        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => {
                let dir = root.join(DATA);
                utils::make_dir(&dir).await?;
                dir
            }
        };

        let db = Db::open(root.join(INVENTORY_DB))
            .await
            .context("Unable to open the inventory database")?;

        Ok(Self {
            root,
            data_dir,
            logs_dir,
            db,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn db_path(&self) -> &Path {
        self.db.path()
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }
}
