use crate::VERSION;
use anyhow::Result;
use dpanel_common::system::PlatformInfo;
use dpanel_common::{field_message, info_message, Colorize};

pub fn version() -> Result<()> {
    println!("{}", VERSION);
    Ok(())
}

pub fn info() -> Result<()> {
    let platform = PlatformInfo::build();

    info_message!("Your System Information:");
    field_message!("OS", "{}", platform.full_os);
    field_message!("Arch", "{}", platform.full_arch);
    if let (Ok(os), Ok(arch)) = (platform.release_os(), platform.release_arch()) {
        field_message!("Tunnel agent", "{}-{}", os, arch);
    }

    Ok(())
}
