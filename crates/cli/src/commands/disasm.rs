use async_trait::async_trait;
use clap::Args;
use std::error::Error;
use vigil_core::decoder::decode_bytecode;

/// Print the disassembly of a bytecode string.
#[derive(Args)]
pub struct DisasmArgs {
    /// Input bytecode as a hex string (with or without 0x).
    #[arg(value_name = "HEX")]
    pub bytecode: String,
}

#[async_trait]
impl super::Command for DisasmArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let (instructions, bytes) = decode_bytecode(&self.bytecode)?;
        for ins in &instructions {
            println!("{ins}");
        }
        eprintln!("{} bytes, {} instructions", bytes.len(), instructions.len());
        Ok(())
    }
}
