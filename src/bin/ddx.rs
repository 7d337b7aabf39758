// Native binary for ddx - one-shot queries and an interactive browser

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::unbounded_channel;

use ddx::{
    app::{Action, App, AppEvent, ListState, Section},
    assets::AssetUrls,
    config::{CliArgs, CliCommand, Config, ListArgs},
    models::{ChampionDetail, GameMap, RuneTree, Version},
    pager,
    pipeline::{self, ListQuery, Listable, Page},
    runtime::{self, Observers},
    DataService, ReqwestClient,
};

const GC_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let cfg = Config::from_args(&args).context("Failed to load configuration")?;
    cfg.print_summary();

    let http = ReqwestClient::new(&cfg.base_url, cfg.http_timeout())?;
    let service = DataService::with_locale(Arc::new(http), cfg.cache_policy(), &cfg.locale);
    let gc_task = service.cache().spawn_gc(GC_INTERVAL);

    let result = match args.command.clone().unwrap_or(CliCommand::Browse) {
        CliCommand::Versions => print_versions(&service).await,
        CliCommand::Champion { id } => print_champion(&service, &cfg, &id).await,
        CliCommand::Champions(list) => print_catalog(&service, &cfg, Section::Champions, &list).await,
        CliCommand::Items(list) => print_catalog(&service, &cfg, Section::Items, &list).await,
        CliCommand::Maps(list) => print_catalog(&service, &cfg, Section::Maps, &list).await,
        CliCommand::Runes(list) => print_catalog(&service, &cfg, Section::Runes, &list).await,
        CliCommand::Browse => browse(&service, &cfg).await,
    };

    gc_task.abort();
    service.cache().log_stats();
    result
}

async fn pick_version(service: &DataService, cfg: &Config) -> Result<Version> {
    match &cfg.version {
        Some(v) => Ok(v.clone()),
        None => service
            .latest_version()
            .await
            .context("Failed to resolve latest version"),
    }
}

async fn print_versions(service: &DataService) -> Result<()> {
    let versions = service.versions().await.context("Failed to fetch versions")?;
    for v in versions.iter() {
        println!("{v}");
    }
    Ok(())
}

fn list_query(cfg: &Config, section: Section, list: &ListArgs) -> ListQuery {
    let mut q = ListQuery::with_page_size(cfg.page_size.unwrap_or(section.default_page_size()));
    if let Some(s) = &list.search {
        q.set_search(s);
    }
    for t in &list.tags {
        q.toggle_tag(t);
    }
    q.set_page(list.page);
    q
}

fn print_page<T: Listable>(page: &Page<'_, T>, row: impl Fn(&T) -> String) {
    if page.total_filtered == 0 {
        println!("(no matches)");
        return;
    }
    for item in page.items.iter().copied() {
        println!("  {}", row(item));
    }
    if page.items.is_empty() {
        println!("  (page {} is past the last page)", page.page_index);
    }
    println!(
        "{} of {} · {}",
        page.items.len(),
        page.total_filtered,
        pager::render(page.page_index, page.total_pages)
    );
}

async fn print_catalog(service: &DataService, cfg: &Config, section: Section, list: &ListArgs) -> Result<()> {
    let version = pick_version(service, cfg).await?;
    let q = list_query(cfg, section, list);
    let fetch_err = || format!("Failed to fetch {section} for {version}");
    match section {
        Section::Champions => {
            let all = service.champions(&version).await.with_context(fetch_err)?;
            print_page(&pipeline::run(&all, &q), |c| {
                format!("{:<14} {:<32} {}", c.id, c.title, c.tags.join(", "))
            });
        }
        Section::Items => {
            let all = service.items(&version).await.with_context(fetch_err)?;
            print_page(&pipeline::run(&all, &q), |i| {
                format!("{:<6} {:<36} {:>5}g  {}", i.id, i.name, i.gold.total, i.plaintext)
            });
        }
        Section::Maps => {
            let all = service.maps(&version).await.with_context(fetch_err)?;
            print_page(&pipeline::run(&all, &q), |m| format!("{:<4} {}", m.map_id, m.map_name));
        }
        Section::Runes => {
            let all = service.runes(&version).await.with_context(fetch_err)?;
            print_page(&pipeline::run(&all, &q), |t| {
                let keystones: Vec<_> = t.keystones().iter().map(|r| r.name.as_str()).collect();
                format!("{:<12} {}", t.name, keystones.join(", "))
            });
        }
    }
    Ok(())
}

fn print_detail(c: &ChampionDetail, version: &Version) {
    let urls = AssetUrls::default();
    let s = &c.summary;
    println!("{}, {}", s.name, s.title);
    println!("  tags: {}   resource: {}", s.tags.join(", "), s.partype);
    println!(
        "  attack {} · defense {} · magic {} · difficulty {}",
        s.info.attack, s.info.defense, s.info.magic, s.info.difficulty
    );
    println!("  portrait: {}", urls.champion_icon(version, s));
    if !c.lore.is_empty() {
        println!("\n{}\n", c.lore);
    }
    println!("  passive: {}", c.passive.name);
    for (slot, spell) in ["Q", "W", "E", "R"].iter().zip(&c.spells) {
        println!("  {slot}: {:<28} cd {}", spell.name, spell.cooldown_burn);
    }
    println!("  skins: {}", c.skins.len());
    for skin in &c.skins {
        println!("    {:<3} {}", skin.num, skin.name);
    }
}

async fn print_champion(service: &DataService, cfg: &Config, id: &str) -> Result<()> {
    let version = pick_version(service, cfg).await?;
    let detail = service
        .champion(&version, id)
        .await
        .with_context(|| format!("Failed to fetch champion {id} for {version}"))?;
    print_detail(&detail, &version);
    Ok(())
}

/// One line of interactive input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Act(Action),
    Next,
    Prev,
    Show,
    Versions,
    Stats,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Input> {
    let line = line.trim();
    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    if let Some(text) = cmd.strip_prefix('/') {
        return Ok(Input::Act(Action::SetSearch(format!("{text} {rest}").trim().to_string())));
    }
    Ok(match cmd {
        "" | "ls" => Input::Show,
        "q" | "quit" | "exit" => Input::Quit,
        "h" | "help" | "?" => Input::Help,
        "stats" => Input::Stats,
        "n" | "next" => Input::Next,
        "prev" => Input::Prev,
        "b" | "back" => Input::Act(Action::Back),
        "clear" => Input::Act(Action::ClearSearch),
        "reset" => Input::Act(Action::ClearFilters),
        "f" | "filters" => Input::Act(Action::ToggleFilters),
        "r" | "retry" => Input::Act(Action::Retry),
        "o" | "open" if !rest.is_empty() => Input::Act(Action::SelectEntity(rest.to_string())),
        "t" | "tag" if !rest.is_empty() => Input::Act(Action::ToggleTag(rest.to_string())),
        "v" | "version" if !rest.is_empty() => Input::Act(Action::ChangeVersion(Version::new(rest))),
        "vs" | "versions" if rest.is_empty() => Input::Versions,
        "vs" | "versions" => {
            let n = rest.parse::<usize>().context("versions expects a page number")?;
            Input::Act(Action::VersionsPage(n))
        }
        "map" if !rest.is_empty() => Input::Act(Action::OpenMap(rest.to_string())),
        "close" => Input::Act(Action::CloseMap),
        ">" => Input::Act(Action::NextMapImage),
        "<" => Input::Act(Action::PrevMapImage),
        "path" => {
            let id = rest.parse::<u32>().context("path expects a rune path id")?;
            Input::Act(Action::ToggleRunePath(id))
        }
        "p" | "page" => {
            let n = rest.parse::<usize>().context("page expects a number")?;
            Input::Act(Action::SetPage(n))
        }
        "s" | "section" => Input::Act(Action::SelectSection(rest.parse()?)),
        other => match other.parse::<Section>() {
            Ok(section) => Input::Act(Action::SelectSection(section)),
            Err(_) => anyhow::bail!("unknown command '{other}' (try 'help')"),
        },
    })
}

const HELP: &str = "\
commands:
  champions | items | maps | runes   switch section
  /text                              search
  clear | reset                      clear search | clear search and tags
  tag <name>                         toggle a tag filter
  page <n> | next | prev             paginate
  open <id> | back                   champion detail
  map <id> | < | > | close           map detail and its pictures
  path <id>                          expand or collapse a rune path
  versions [page]                    list published versions
  version <v>                        switch feed version
  filters                            show/hide available tags
  retry                              refetch anything that failed
  stats | help | quit";

fn render(app: &App) {
    let version = app.version().map(|v| v.to_string()).unwrap_or_else(|| "…".into());
    println!("\n== {} @ {} ==", app.section(), version);

    if let Some(slot) = app.detail_slot() {
        match (app.champion_detail(), slot.error()) {
            (Some(detail), _) => {
                if let Some(v) = app.version() {
                    print_detail(detail, v);
                }
            }
            (None, Some(e)) => println!("champion unavailable: {e} (type 'retry')"),
            (None, None) => println!("loading champion…"),
        }
        return;
    }

    if let Some(view) = app.map_view() {
        match (app.open_map(), app.version()) {
            (Some(m), Some(v)) => print_map(m, v, view.image_index),
            _ if app.is_loading() => println!("loading map…"),
            _ => println!("map {} not found (type 'close')", view.map_id),
        }
        return;
    }

    let q = app.query();
    if q.has_active_filters() {
        let tags: Vec<_> = q.selected_tags.iter().cloned().collect();
        println!("search: '{}'  tags: [{}]", q.search_text, tags.join(", "));
    }
    if app.show_filters() {
        println!("available tags: {}", app.available_tags().join(", "));
    }

    match app.list_state() {
        ListState::Loading => println!("loading…"),
        ListState::Unavailable(e) => println!("unavailable: {e} (type 'retry')"),
        ListState::Empty => println!("(nothing published for this version)"),
        ListState::NoMatches => println!("(no matches)"),
        ListState::Rows => match app.section() {
            Section::Champions => print_page(&app.champion_page(), |c| format!("{:<14} {}", c.id, c.title)),
            Section::Items => print_page(&app.item_page(), |i| format!("{:<6} {}", i.id, i.name)),
            Section::Maps => print_page(&app.map_page(), |m| format!("{:<4} {}", m.map_id, m.map_name)),
            Section::Runes => {
                print_page(&app.rune_page(), |t| format!("{:<5} {}", t.id, t.display_name()));
                if let Some(tree) = app.expanded_rune_tree() {
                    print_rune_tree(tree);
                }
            }
        },
    }
}

fn print_map(m: &GameMap, version: &Version, image_index: usize) {
    let gallery = AssetUrls::default().map_gallery(version, m);
    println!("{} (map {})", m.map_name, m.map_id);
    println!("  mode: {}", m.game_mode());
    if let Some(img) = gallery.get(image_index) {
        println!("  [{}/{}] {}: {}", image_index + 1, gallery.len(), img.label, img.url);
    }
}

fn print_rune_tree(tree: &RuneTree) {
    println!("\n{} ({})", tree.name, tree.key);
    for (i, slot) in tree.slots.iter().enumerate() {
        let label = if i == 0 { "Keystone".to_string() } else { format!("Slot {}", i + 1) };
        let names: Vec<_> = slot.runes.iter().map(|r| r.name.as_str()).collect();
        println!("  {label:<9} {}", names.join(", "));
    }
}

fn print_version_window(app: &App) {
    if app.versions().is_empty() {
        println!("versions not loaded yet");
        return;
    }
    let current = app.version();
    for v in app.version_window() {
        let mark = if Some(v) == current { "*" } else { " " };
        println!(" {mark} {v}");
    }
    let page = app.versions_page();
    let pages = app.versions_page_count();
    let prev = if pager::has_prev(page) { "‹" } else { " " };
    let next = if pager::has_next(page, pages) { "›" } else { " " };
    println!("{prev} versions page {page}/{pages} {next}");
}

fn total_pages(app: &App) -> usize {
    match app.section() {
        Section::Champions => app.champion_page().total_pages,
        Section::Items => app.item_page().total_pages,
        Section::Maps => app.map_page().total_pages,
        Section::Runes => app.rune_page().total_pages,
    }
}

async fn browse(service: &DataService, cfg: &Config) -> Result<()> {
    let (tx, mut rx) = unbounded_channel::<AppEvent>();
    let mut app = App::new(cfg.version.clone(), cfg.page_size);
    let mut observers = Observers::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");
    runtime::execute(service, app.start(), &tx);
    observers.sync(service, &app.wanted_keys());

    loop {
        tokio::select! {
            ev = rx.recv() => {
                let Some(ev) = ev else { break };
                let was_loading = app.is_loading();
                let cmds = app.on_event(ev);
                runtime::execute(service, cmds, &tx);
                observers.sync(service, &app.wanted_keys());
                if was_loading && !app.is_loading() {
                    render(&app);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else { break };
                let input = match parse_input(&line) {
                    Ok(i) => i,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                let action = match input {
                    Input::Quit => break,
                    Input::Help => {
                        println!("{HELP}");
                        continue;
                    }
                    Input::Stats => {
                        let s = service.cache().stats();
                        println!(
                            "entries={} hits={} stale={} misses={} coalesced={} fetches={} evictions={}",
                            service.cache().len(), s.hits, s.stale_hits, s.misses, s.coalesced, s.fetches, s.evictions
                        );
                        continue;
                    }
                    Input::Show => {
                        render(&app);
                        continue;
                    }
                    Input::Versions => {
                        print_version_window(&app);
                        continue;
                    }
                    Input::Next => {
                        let page = app.query().page_index;
                        if !pager::has_next(page, total_pages(&app)) {
                            println!("already on the last page");
                            continue;
                        }
                        Action::SetPage(page + 1)
                    }
                    Input::Prev => {
                        let page = app.query().page_index;
                        if !pager::has_prev(page) {
                            println!("already on the first page");
                            continue;
                        }
                        Action::SetPage(page - 1)
                    }
                    Input::Act(a) => a,
                };
                let versions_nav = matches!(action, Action::VersionsPage(_));
                match app.apply(action) {
                    Ok(cmds) => {
                        runtime::execute(service, cmds, &tx);
                        observers.sync(service, &app.wanted_keys());
                    }
                    Err(e) => println!("{e}"),
                }
                if versions_nav {
                    print_version_window(&app);
                } else {
                    render(&app);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tx.send(AppEvent::Quit).ok();
            }
        }
        if app.quit_flag() {
            break;
        }
    }
    Ok(())
}
