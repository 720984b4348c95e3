#[macro_use]
extern crate clap;
extern crate boxflow;
extern crate env_logger;

use boxflow::context::RenderContext;
use boxflow::css::CssData;
use boxflow::dom::{build_dom, print_dom};
use boxflow::generate_box_tree;
use std::fs;
use std::fs::File;

enum DumpKind {
    Boxes,
    Dom,
}

fn main() {
    use clap::{AppSettings, SubCommand};

    env_logger::init();

    let args = app_from_crate!()
        .subcommand(
            SubCommand::with_name("boxes")
                .about("Dumps the normalized box tree for an HTML document")
                .arg_from_usage("<input>  'The document to build the tree for'"),
        )
        .subcommand(
            SubCommand::with_name("dom")
                .about("Dumps a DOM tree from an HTML document")
                .arg_from_usage("<input>  'The document to build the tree for'"),
        )
        .setting(AppSettings::ArgRequiredElseHelp)
        .get_matches();
    let (input, kind) = {
        if let Some(args) = args.subcommand_matches("boxes") {
            let input = args.value_of("input").unwrap();
            (input, DumpKind::Boxes)
        } else if let Some(args) = args.subcommand_matches("dom") {
            let input = args.value_of("input").unwrap();
            (input, DumpKind::Dom)
        } else {
            panic!("Unknown subcommand, {:?}", args);
        }
    };

    match kind {
        DumpKind::Dom => {
            let mut file = File::open(input).expect("Couldn't open input file");
            let dom = build_dom(&mut file).expect("Failed to parse input file?");
            print_dom(&dom);
        },
        DumpKind::Boxes => {
            let html = fs::read_to_string(input).expect("Couldn't open input file");
            let context = RenderContext::default();
            let css = CssData::with_defaults();
            let result =
                generate_box_tree(&html, &context, &css).expect("Failed to parse input file?");
            for error in &result.errors {
                eprintln!("{:?} at {:?}: {}", error.kind, error.subtree, error.message);
            }
            result.tree.print();
        },
    }
}
