// Windows builds use the GUI subsystem, so a headless run has to borrow the
// launching terminal's console before anything is printed.
#![windows_subsystem = "windows"]

use std::process::ExitCode;

use artistlogo::app::ArtistLogoApp;
use artistlogo::{cli, log_err, logger};
use clap::Parser;
use eframe::egui;

fn main() -> ExitCode {
    if cli::CliArgs::is_cli_mode() {
        #[cfg(windows)]
        console::attach_parent();
        logger::init("headless");
        return cli::run(cli::CliArgs::parse());
    }

    logger::init("gui");
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([720.0, 480.0])
            .with_title("ArtistLogo"),
        ..Default::default()
    };
    match eframe::run_native(
        "ArtistLogo",
        options,
        Box::new(|cc| Box::new(ArtistLogoApp::new(cc))),
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_err!("eframe: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(windows)]
mod console {
    use std::ffi::c_void;

    unsafe extern "system" {
        fn AttachConsole(process_id: u32) -> i32;
        fn CreateFileW(
            name: *const u16,
            access: u32,
            share: u32,
            security: *const c_void,
            disposition: u32,
            flags: u32,
            template: isize,
        ) -> isize;
        fn SetStdHandle(which: u32, handle: isize) -> i32;
    }

    const PARENT: u32 = u32::MAX;
    const READ: u32 = 0x8000_0000;
    const WRITE: u32 = 0x4000_0000;
    const SHARE_ALL: u32 = 3;
    const OPEN_EXISTING: u32 = 3;
    const STDIN: u32 = -10i32 as u32;
    const STDOUT: u32 = -11i32 as u32;
    const STDERR: u32 = -12i32 as u32;

    /// Point the std handles at the parent terminal, if there is one.
    pub fn attach_parent() {
        let devices: [(&str, u32, &[u32]); 2] =
            [("CONOUT$", WRITE, &[STDOUT, STDERR]), ("CONIN$", READ, &[STDIN])];
        // SAFETY: plain Win32 calls on NUL-terminated names; handles that
        // fail to open are never installed.
        unsafe {
            if AttachConsole(PARENT) == 0 {
                return;
            }
            for (device, access, targets) in devices {
                let name: Vec<u16> = device.encode_utf16().chain(Some(0)).collect();
                let handle =
                    CreateFileW(name.as_ptr(), access, SHARE_ALL, std::ptr::null(), OPEN_EXISTING, 0, 0);
                if handle == -1 {
                    continue;
                }
                for &target in targets {
                    SetStdHandle(target, handle);
                }
            }
        }
    }
}
