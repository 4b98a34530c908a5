use crate::fetch::fetch_code;
use crate::printer::print_report;
use async_trait::async_trait;
use clap::Args;
use std::error::Error;
use vigil_core::AnalyzeOptions;

/// Analyze the DELEGATECALL surface of a contract.
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Runtime bytecode as a hex string (with or without 0x).
    #[arg(long, value_name = "HEX", conflicts_with = "address")]
    pub bytecode: Option<String>,
    /// Contract address to fetch deployed code for over JSON-RPC.
    #[arg(long, value_name = "ADDRESS")]
    pub address: Option<String>,
    /// Network name used to resolve the RPC endpoint.
    #[arg(long, value_name = "NAME", default_value = "mainnet")]
    pub network: String,
    /// Explicit RPC endpoint, overriding environment resolution.
    #[arg(long, value_name = "URL")]
    pub rpc_url: Option<String>,
    /// Emit the raw report JSON instead of the human-readable summary.
    #[arg(long)]
    pub json: bool,
    /// Skip CFG construction and trace the instruction stream linearly.
    #[arg(long)]
    pub linear: bool,
}

#[async_trait]
impl super::Command for AnalyzeArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let bytecode = match (&self.bytecode, &self.address) {
            (Some(code), _) => code.clone(),
            (None, Some(address)) => {
                fetch_code(address, &self.network, self.rpc_url.as_deref())
                    .await
                    .map_err(|e| format!("Analysis failed: {e}"))?
            }
            (None, None) => {
                return Err("either --bytecode or --address is required".into());
            }
        };

        let options = AnalyzeOptions {
            contract_address: self.address.clone(),
            network: self.address.is_some().then(|| self.network.clone()),
            use_cfg: !self.linear,
        };

        let report = vigil_core::analyze(&bytecode, &options)
            .map_err(|e| format!("Analysis failed: {e}"))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(())
    }
}
