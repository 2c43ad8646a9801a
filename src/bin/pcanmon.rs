// pcanbasic/src/bin/pcanmon.rs
//
// Command-line monitor for PCAN channels.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Simple CLI tool to list PCAN channels, watch the traffic on one, or
//! send a frame to it.
//!
//! ```text
//! $ pcanmon list
//! $ pcanmon monitor 51 --bitrate 250k --period
//! $ pcanmon send 51 123#DEADBEEF
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{arg, value_parser, ArgAction, ArgMatches, Command};
use pcanbasic::{
    enumerate_channels, ffi::Handle, params::DEFAULT_FD_BITRATE, Bitrate, CanFdFrame, CanFrame,
    FilterConfig, PcanBasic, Parameter, ReadMode, Session, Status,
};
use std::{
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

// Make the app version the same as the package.
const VERSION: &str = env!("CARGO_PKG_VERSION");

static QUIT: AtomicBool = AtomicBool::new(false);

// --------------------------------------------------------------------------

/// Parses a channel handle given in hex, with or without a trailing 'h'.
fn parse_handle(s: &str) -> Result<Handle> {
    let s = s.trim_start_matches("0x").trim_end_matches(['h', 'H']);
    Handle::from_str_radix(s, 16).with_context(|| format!("Invalid channel handle '{}'", s))
}

/// Turns a failed status into an error, with the driver's description.
fn check(session: &Session, sts: Status, what: &str) -> Result<()> {
    if sts.is_ok() {
        Ok(())
    } else {
        Err(anyhow!("{}: {}", what, session.format_error(sts)))
    }
}

/// Connects a session from the common channel options.
fn connect(pcan: Arc<PcanBasic>, opts: &ArgMatches) -> Result<Session> {
    let channel = parse_handle(opts.get_one::<String>("channel").unwrap())?;
    let mut session = Session::new(pcan);

    let sts = if opts.get_flag("fd") {
        let bitrate = opts
            .get_one::<String>("fd-bitrate")
            .map(String::as_str)
            .unwrap_or(DEFAULT_FD_BITRATE);
        session.connect_fd(channel, bitrate)
    } else {
        let name = opts.get_one::<String>("bitrate").unwrap();
        let bitrate =
            Bitrate::from_name(name).ok_or_else(|| anyhow!("Unknown bit rate '{}'", name))?;
        session.connect(channel, bitrate)
    };
    check(&session, sts, "Unable to connect")?;
    Ok(session)
}

// --------------------------------------------------------------------------

/// Process the 'list' subcommand.
fn list_cmd(pcan: &PcanBasic) -> Result<()> {
    let (sts, version) = pcan.get_string(pcanbasic::ffi::PCAN_NONEBUS, Parameter::API_VERSION);
    if sts.is_ok() {
        println!("PCAN-Basic API {}", version);
    }

    let list = enumerate_channels(pcan);
    for (i, entry) in list.entries.iter().enumerate() {
        let mark = if Some(i) == list.selected { '*' } else { ' ' };
        println!("{} {}", mark, entry);
    }
    if let Some(sts) = list.error {
        eprintln!(
            "Attached channels unavailable: {}",
            pcan.formatted_error(sts, pcanbasic::Language::NEUTRAL)
        );
    }
    Ok(())
}

/// Process the 'monitor' subcommand.
///
/// Prints each message row that changed on every display tick, until
/// interrupted or the tick count runs out.
fn monitor_cmd(pcan: Arc<PcanBasic>, opts: &ArgMatches) -> Result<()> {
    let mut session = connect(pcan, opts)?;

    let mode = *opts.get_one::<ReadMode>("mode").unwrap();
    session.set_read_mode(mode)?;
    session.set_show_period(opts.get_flag("period"));

    if let Some(range) = opts.get_one::<String>("filter") {
        let (from, to) = range
            .split_once('-')
            .ok_or_else(|| anyhow!("Filter must be a range, like '100-1FF'"))?;
        let from_id = u32::from_str_radix(from, 16)?;
        let to_id = u32::from_str_radix(to, 16)?;
        let filter = FilterConfig::Custom {
            from_id,
            to_id,
            extended: to_id > 0x7FF,
        };
        check(&session, session.configure_filter(filter), "Unable to set filter")?;
    }

    ctrlc::set_handler(|| {
        QUIT.store(true, Ordering::Relaxed);
    })
    .context("Failed to set ^C signal handler")?;

    let mut ticks = opts.get_one::<u64>("count").copied();
    let interval = session.config().display_interval;

    while !QUIT.load(Ordering::Relaxed) && ticks != Some(0) {
        if mode == ReadMode::Manual {
            session.read_manual();
        }
        for rec in session.display_tick() {
            println!(
                "{:3} {:<14} {:>9} {:2} {:>8} {:>6} {}",
                rec.index(),
                rec.type_string(),
                rec.id_string(),
                rec.len(),
                rec.time_string(),
                rec.count(),
                rec.data_string()
            );
        }
        ticks = ticks.map(|n| n - 1);
        thread::sleep(interval);
    }

    let sts = session.get_status();
    println!("Bus status: {}", sts.bus_state_name(session.is_fd()));
    session.release();
    Ok(())
}

/// Process the 'send' subcommand.
fn send_cmd(pcan: Arc<PcanBasic>, opts: &ArgMatches) -> Result<()> {
    let session = connect(pcan, opts)?;
    let frame: CanFdFrame = opts.get_one::<String>("frame").unwrap().parse()?;

    let sts = if session.is_fd() {
        session.write_fd(&frame)
    } else {
        session.write(&CanFrame::try_from(frame)?)
    };
    check(&session, sts, "Unable to send")
}

// --------------------------------------------------------------------------

fn channel_args(cmd: Command<'static>) -> Command<'static> {
    cmd.arg(
        arg!(<channel> "The channel handle in hex, like '51' for PCAN_USBBUS1")
            .required(true)
            .index(1),
    )
    .arg(
        arg!(-b --bitrate <RATE> "The classic bit rate, like '500k' or '1M'")
            .required(false)
            .default_value("500k"),
    )
    .arg(arg!(--fd "Open the channel in CAN FD mode").action(ArgAction::SetTrue))
    .arg(arg!(--"fd-bitrate" <BITRATE> "The FD bit rate string").required(false))
}

fn main() {
    env_logger::init();

    let opts = Command::new("pcanmon")
        .version(VERSION)
        .about("Command line tool to monitor PCAN channels")
        .disable_help_flag(true)
        .arg(
            arg!(--help "Print help information")
                .short('?')
                .action(ArgAction::Help)
                .global(true),
        )
        .subcommand(Command::new("list").about("List the channels that can be opened"))
        .subcommand(
            channel_args(Command::new("monitor"))
                .about("Show the traffic on a channel, one row per message")
                .arg(
                    arg!(-m --mode <MODE> "How frames are read: timer, event, or manual")
                        .required(false)
                        .default_value("timer")
                        .value_parser(value_parser!(ReadMode)),
                )
                .arg(
                    arg!(-p --period "Show the time between frames")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    arg!(-f --filter <RANGE> "Only receive an ID range, like '100-1FF'")
                        .required(false),
                )
                .arg(
                    arg!(-n --count <TICKS> "Stop after this many display updates")
                        .required(false)
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand(
            channel_args(Command::new("send"))
                .about("Send a frame, like '123#DEADBEEF' or '1F334455##1AABB'")
                .arg(arg!(<frame> "The frame to send").required(true).index(2)),
        )
        .get_matches();

    let pcan = Arc::new(PcanBasic::new());
    if let Some(err) = pcan.bind_error() {
        eprintln!("{}", err);
        process::exit(1);
    }

    let res = match opts.subcommand() {
        Some(("list", _)) => list_cmd(&pcan),
        Some(("monitor", sub_opts)) => monitor_cmd(pcan.clone(), sub_opts),
        Some(("send", sub_opts)) => send_cmd(pcan.clone(), sub_opts),
        _ => Err(anyhow!("Need to specify a subcommand (-? for help).")),
    };

    if let Err(err) = res {
        eprintln!("{}", err);
        process::exit(1);
    }
}
