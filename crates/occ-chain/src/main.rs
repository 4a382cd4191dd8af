use std::{
    fs::File,
    io::{
        BufRead as _,
        BufReader,
    },
    path::Path,
    process::ExitCode,
};

use base64::{
    engine::general_purpose::STANDARD,
    Engine as _,
};
use eyre::WrapErr as _;
use occ_chain::{
    App,
    BlockData,
    Config,
    GenesisAppState,
    VoteInfo,
};
use occ_storage::Storage;
use serde::Deserialize;
use tracing::{
    error,
    info,
};

// Following the BSD convention for failing to read config
// See here: https://freedesktop.org/software/systemd/man/systemd.exec.html#Process%20Exit%20Codes
const EX_CONFIG: u8 = 78;

/// A block as written in the blocks file, with base64 encoded transactions.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BlockLine {
    height: u64,
    time: u64,
    proposer_address: tendermint::account::Id,
    #[serde(default)]
    decided_last_commit: Vec<VoteInfo>,
    #[serde(default)]
    txs: Vec<String>,
}

impl BlockLine {
    fn into_block_data(self) -> eyre::Result<BlockData> {
        let txs = self
            .txs
            .iter()
            .enumerate()
            .map(|(index, tx)| {
                STANDARD
                    .decode(tx)
                    .wrap_err_with(|| format!("transaction {index} is not valid base64"))
            })
            .collect::<eyre::Result<_>>()?;
        Ok(BlockData {
            height: self.height,
            time: self.time,
            proposer_address: self.proposer_address,
            decided_last_commit: self.decided_last_commit,
            txs,
        })
    }
}

fn main() -> ExitCode {
    let cfg: Config = match config::get() {
        Err(e) => {
            eprintln!("failed reading config:\n{e:?}");
            return ExitCode::from(EX_CONFIG);
        }
        Ok(cfg) => cfg,
    };
    if let Err(err) = telemetry::configure()
        .set_filter_directives(&cfg.log)
        .set_pretty_print(cfg.pretty_print)
        .set_force_stdout(cfg.force_stdout)
        .try_init()
    {
        eprintln!("failed initializing telemetry:\n{err:?}");
        return ExitCode::FAILURE;
    }

    info!(
        config = %serde_json::to_string(&cfg).unwrap_or_default(),
        "initializing occ chain"
    );

    match run(&cfg) {
        Err(e) => {
            let error: &(dyn std::error::Error + 'static) = e.as_ref();
            error!(error, "block replay failed");
            ExitCode::FAILURE
        }
        Ok(blocks) => {
            info!(blocks, "replayed all blocks");
            ExitCode::SUCCESS
        }
    }
}

fn run(cfg: &Config) -> eyre::Result<u64> {
    let genesis = read_genesis(&cfg.genesis_file)?;
    let mut app =
        App::new(Storage::new(), cfg.app_config()).wrap_err("failed initializing app")?;
    let init = app.init_chain(&genesis).wrap_err("failed initializing chain")?;
    info!(
        app_hash = %init.app_hash,
        validators = init.validators.len(),
        "committed genesis"
    );

    let blocks = File::open(&cfg.blocks_file).wrap_err_with(|| {
        format!("failed opening blocks file `{}`", cfg.blocks_file.display())
    })?;
    let mut replayed = 0;
    for (number, line) in BufReader::new(blocks).lines().enumerate() {
        let line = line.wrap_err("failed reading blocks file")?;
        if line.trim().is_empty() {
            continue;
        }
        let block = serde_json::from_str::<BlockLine>(&line)
            .wrap_err_with(|| format!("line {} is not a valid block", number + 1))?
            .into_block_data()?;
        let (response, app_hash) = app
            .process_block(&block)
            .wrap_err_with(|| format!("failed processing block {}", block.height))?;
        let failed = response
            .tx_results
            .iter()
            .filter(|result| !result.code.is_ok())
            .count();
        info!(
            height = block.height,
            txs = response.tx_results.len(),
            failed,
            validator_updates = %serde_json::to_string(&response.validator_updates)
                .unwrap_or_default(),
            %app_hash,
            "committed block"
        );
        replayed += 1;
    }
    Ok(replayed)
}

fn read_genesis(path: &Path) -> eyre::Result<GenesisAppState> {
    let file = File::open(path)
        .wrap_err_with(|| format!("failed opening genesis file `{}`", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).wrap_err("failed parsing genesis file")
}
