// Epilog for `lcc --help`, generated from docs/HELP.md by build.rs.
include!(concat!(env!("OUT_DIR"), "/help_content.rs"));
