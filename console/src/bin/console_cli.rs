use std::io::{self, BufWriter};
use std::process::exit;

use access_lib::backplane::{Backplane, DEFAULT_MEM_BYTES};
use access_lib::{Access, CommandServer, LocalAccess, RemoteAccess};
use console_lib::{script, Console};

use clap::{Parser, Subcommand};
use clap_stdin::FileOrStdin;
use log::error;

/// PDP-11 front panel console
#[derive(Parser)]
#[command(about)]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Serve a simulated backplane to remote consoles
    Listen {
        /// TCP port to listen on
        port: u16,

        /// Bytes of memory below the I/O page
        #[arg(long, default_value_t = DEFAULT_MEM_BYTES)]
        mem: u32,
    },

    /// Run a console script against a remote server
    Connect {
        /// host:port of the server
        addr: String,

        /// Console script ("-" or absent for stdin)
        #[arg(default_value = "-")]
        script: FileOrStdin,
    },

    /// Run a console script against an in-process simulated backplane
    Local {
        /// Console script ("-" or absent for stdin)
        #[arg(default_value = "-")]
        script: FileOrStdin,

        /// Bytes of memory below the I/O page
        #[arg(long, default_value_t = DEFAULT_MEM_BYTES)]
        mem: u32,
    },
}

fn fail(msg: impl std::fmt::Display) -> ! {
    error!("{msg}");
    eprintln!("console_cli: {msg}");
    exit(1);
}

fn run_script(access: Access, script: FileOrStdin) {
    let text = match script.contents() {
        Ok(text) => text,
        Err(e) => fail(format!("can't read script: {e}")),
    };
    let mut con = match Console::new(access) {
        Ok(con) => con,
        Err(e) => fail(e),
    };
    let mut out = BufWriter::new(io::stdout().lock());
    if let Err(e) = script::run(&mut con, &text, &mut out) {
        fail(e);
    }
}

fn main() {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            exit(1);
        }
        Err(e) => e.exit(),
    };

    match args.cmd {
        Cmd::Listen { port, mem } => {
            let mut server = CommandServer::new(LocalAccess::new(Backplane::with_memory(mem)));
            if let Err(e) = server.listen(port) {
                fail(format!("can't listen on port {port}: {e}"));
            }
        }
        Cmd::Connect { addr, script } => {
            let remote = match RemoteAccess::connect(addr.as_str()) {
                Ok(remote) => remote,
                Err(e) => fail(format!("can't connect to {addr}: {e}")),
            };
            run_script(Access::Remote(remote), script);
        }
        Cmd::Local { script, mem } => {
            run_script(Access::Local(LocalAccess::new(Backplane::with_memory(mem))), script);
        }
    }
}
