//! makeproject's main application entry point and orchestration logic.
//! Handles command-line argument parsing, tree building, and generation
//! with interactive conflict handling.

use log::debug;
use std::path::Path;

use makeproject::{
    cli::{get_args, Args},
    config::load_config,
    constants::DEFAULT_STRUCTURE,
    context::TokenContext,
    error::{default_error_handler, Error, Result, TemplateKind},
    generator::generate,
    library::{DirectoryLibrary, TemplateLibrary},
    prompt::{ConflictResolver, DialoguerPrompter},
    substitute::Substituter,
    tree::TreeBuilder,
};

/// Main application entry point.
fn main() {
    let args = get_args();

    // Logger configuration
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Off
        })
        .init();

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

/// Main application logic execution.
///
/// # Flow
/// 1. Loads the configuration, custom tokens and preamble
/// 2. Reads the structure document (a file, or a library template with `--named`)
/// 3. Builds the project tree
/// 4. Prints the tree (`--preview`) or writes it under the output directory
fn run(args: Args) -> Result<()> {
    if args.print_default {
        print!("{DEFAULT_STRUCTURE}");
        return Ok(());
    }
    let structure = args
        .structure
        .ok_or_else(|| Error::ConfigError("no structure document given".to_string()))?;

    let config = load_config(args.config.as_ref())?;
    let tokens = config.tokens()?;
    let context = TokenContext::new(&args.title, &args.description).with_custom_tokens(&tokens);

    let preamble = match &args.preamble {
        Some(path) => Some(std::fs::read_to_string(path).map_err(Error::IoError)?),
        None => config.python_preamble.clone(),
    };
    let substituter = Substituter::default().with_preamble(preamble);
    let library = DirectoryLibrary::new(
        args.project_templates.or(config.project_templates_dir),
        args.file_templates.or(config.file_templates_dir),
    );
    let builder = TreeBuilder::new(&substituter, &library);

    let (document, root) = if args.named {
        let source = library
            .project_template(&structure)
            .ok_or_else(|| Error::MissingTemplate {
                kind: TemplateKind::Project,
                name: structure.clone(),
            })?;
        let root = builder.build_source(&structure, &source, &context, &[structure.clone()])?;
        (structure, root)
    } else {
        let path = Path::new(&structure);
        let source = std::fs::read_to_string(path).map_err(Error::IoError)?;
        let document = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| structure.clone());
        let root = builder.build_source(&document, &source, &context, &[])?;
        (document, root)
    };
    let root = root.ok_or_else(|| Error::InvalidItems {
        origin: format!("\"{document}\""),
        message: "the document has no item list".to_string(),
    })?;

    if args.preview {
        print!("{}", root.render_tree());
        return Ok(());
    }

    let destination = args.output_dir.join(&root.name);
    debug!("Generating {} files into {}", root.file_count(), destination.display());

    let prompter = DialoguerPrompter::new();
    let mut resolver = ConflictResolver::new(&prompter, args.on_conflict);
    let mut on_conflict = |path: &Path, destination: &Path, is_folder: bool| {
        resolver.resolve(path, destination, is_folder)
    };
    let mut on_progress = |written: usize, total: usize| {
        debug!("Progress: {}/{}", written, total);
    };
    let outcome = generate(&root, &destination, Some(&mut on_progress), Some(&mut on_conflict));

    if let Some(err) = resolver.take_error() {
        return Err(err);
    }
    if outcome.success || outcome.is_cancelled() {
        println!("{}", outcome.message);
        Ok(())
    } else {
        eprintln!("{}", outcome.message);
        std::process::exit(1);
    }
}
