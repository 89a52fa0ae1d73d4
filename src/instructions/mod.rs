// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

mod flag;
pub use flag::*;

mod heredoc;
pub use heredoc::*;

mod pairs;
pub use pairs::*;

mod from;
pub use from::*;

mod copy;
pub use copy::*;

mod arg;
pub use arg::*;

mod label;
pub use label::*;

mod env;
pub use env::*;

mod run;
pub use run::*;

mod entrypoint;
pub use entrypoint::*;

mod cmd;
pub use cmd::*;

mod shell;
pub use shell::*;

mod expose;
pub use expose::*;

mod volume;
pub use volume::*;

mod simple;
pub use simple::*;

mod onbuild;
pub use onbuild::*;

mod healthcheck;
pub use healthcheck::*;

mod misc;
pub use misc::*;
