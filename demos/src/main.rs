use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use church_auth::FileStorage;
use glorious_church::admin::{self, AdminLogin};
use glorious_church::content;
use glorious_church::i18n::Language;
use glorious_church::prayer::PrayerPage;
use glorious_church::prelude::*;
use glorious_church::router::nav_links;
use glorious_church::wizard::checkout::price_label;
use glorious_church::wizard::BuyOutcome;

#[derive(Parser, Debug)]
#[clap(name = "church", version)]
#[clap(about = "Drive the Glorious Church site from the terminal", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// File holding the session and language between runs
    #[clap(long, default_value = ".church/local_storage.json")]
    state: PathBuf,

    /// Directory or URL with the translation documents
    #[clap(long)]
    translations: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the public pages
    Tour {
        /// Only sermons matching this text
        #[clap(long)]
        search: Option<String>,
    },
    /// Switch the site language (en, fr)
    Lang { code: String },
    /// Make a donation
    Give {
        amount: String,
        #[clap(long, default_value = "offering")]
        category: String,
        #[clap(long, default_value = "XAF")]
        currency: String,
        #[clap(long)]
        name: Option<String>,
    },
    /// Buy an e-book from the shop
    Buy { ebook_id: String, email: String },
    /// Send a prayer request
    Pray {
        message: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        email: Option<String>,
        #[clap(long)]
        private: bool,
    },
    /// Sign in to the admin area
    Login { email: String, password: String },
    /// Sign out of the admin area
    Logout,
    /// Show the admin dashboard
    Dashboard,
}

fn parse_category(value: &str) -> anyhow::Result<DonationCategory> {
    DonationCategory::ALL
        .into_iter()
        .find(|c| c.as_str() == value)
        .with_context(|| format!("unknown donation category '{}'", value))
}

async fn tour(client: &ChurchClient, search: Option<String>) -> anyhow::Result<()> {
    let i18n = client.localizer();
    i18n.reload().await;
    let gateway = client.gateway();

    let links: Vec<String> = nav_links().iter().map(|l| i18n.t(l.label_key)).collect();
    println!("{}", links.join(" | "));

    println!("\n== {} ==", i18n.t("nav.live"));
    match content::load_live_stream(&gateway).await {
        Some(stream) => println!("{:?}: {} ({})", stream.platform, stream.title, stream.embed_url),
        None => println!("No live stream right now"),
    }

    println!("\n== {} ==", i18n.t("nav.sermons"));
    let sermons = content::load_sermons(&gateway).await;
    for sermon in content::search_sermons(&sermons, search.as_deref().unwrap_or_default()) {
        println!("{}  {} / {}", sermon.sermon_date, sermon.title, sermon.preacher);
    }

    println!("\n== {} ==", i18n.t("nav.events"));
    for event in content::load_events(&gateway).await {
        println!("{} {}  {} @ {}", event.event_date, event.event_time, event.title, event.location);
    }

    println!("\n== {} ==", i18n.t("nav.about"));
    for leader in content::load_leaders(&gateway).await {
        println!("{}. {} ({})", leader.display_order, leader.name, leader.role);
    }

    println!("\n== {} ==", i18n.t("shop.title"));
    for book in content::load_ebooks(&gateway).await {
        println!("[{}] {}  {}", book.id, book.title, price_label(&book, &i18n));
    }

    let contact = content::ContactInfo::default();
    println!("\n{} | {} | {}", contact.phone, contact.email, contact.whatsapp_link());
    Ok(())
}

async fn give(
    client: &ChurchClient,
    amount: String,
    category: &str,
    currency: &str,
    name: Option<String>,
) -> anyhow::Result<()> {
    let mut wizard = DonationWizard::new();
    {
        let form = wizard.form_mut();
        form.amount = amount;
        form.category = parse_category(category)?;
        form.currency = Currency::from_code(currency)
            .with_context(|| format!("unsupported currency '{}'", currency))?;
        form.donor_name = name.unwrap_or_default();
    }
    wizard.proceed()?;

    println!("Processing payment...");
    let confirmation = wizard.confirm(&client.payments(), &client.gateway()).await?;
    if let Some(warning) = &confirmation.warning {
        eprintln!("warning: {}", warning);
    }
    println!(
        "Thank you! {} received (ref {})",
        wizard.success_message().unwrap_or_default(),
        confirmation.receipt.reference
    );
    Ok(())
}

async fn buy(client: &ChurchClient, ebook_id: &str, email: &str) -> anyhow::Result<()> {
    let gateway = client.gateway();
    let books = content::load_ebooks(&gateway).await;
    let book = books
        .iter()
        .find(|b| b.id == ebook_id)
        .with_context(|| format!("no e-book with id '{}'", ebook_id))?;

    let mut checkout = Checkout::new();
    match checkout.buy(book) {
        BuyOutcome::Download(url) => {
            println!("Free download: {}", url);
            return Ok(());
        }
        BuyOutcome::Checkout => {}
    }
    checkout.set_email(email);
    checkout.continue_to_payment()?;

    println!("Processing payment...");
    let confirmation = checkout.confirm(&client.payments(), &gateway).await?;
    println!(
        "Order complete (ref {}). Download: {}",
        confirmation.receipt.reference, book.file_url
    );
    Ok(())
}

async fn dashboard(client: &ChurchClient) -> anyhow::Result<()> {
    match client.session_gate().navigate("#/admin/dashboard") {
        Some(GateDecision::Render(_)) => {}
        _ => bail!("not signed in; run `church login` first"),
    }
    let gateway = client.gateway();

    let stats = admin::load_overview(&gateway).await;
    println!("Total Posts:      {}", stats.posts);
    println!("Upcoming Events:  {}", stats.events);
    println!("Donations (FCFA): {}", stats.donations_display());
    println!("Digital Books:    {}", stats.ebooks);

    println!("\n== Prayer requests ==");
    for row in admin::load_prayer_requests(&gateway).await {
        println!(
            "{}  {:<20} [{}] {}",
            row.received_at.format("%Y-%m-%d"),
            row.sender,
            row.visibility.label(),
            row.message
        );
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = SiteConfig::from_env()?;
    let mut options = ClientOptions::default();
    if let Some(translations) = &cli.translations {
        options = options.with_translations_base(translations);
    }
    let storage = Arc::new(FileStorage::open(&cli.state));
    let client = ChurchClient::new_with_options(config, options, storage)?;

    match cli.command {
        Commands::Tour { search } => tour(&client, search).await?,
        Commands::Lang { code } => {
            let language: Language = code.parse()?;
            let loaded = client.localizer().set_language(language).await?;
            println!(
                "Language set to {}{}",
                language.native_name(),
                if loaded { "" } else { " (translations unavailable)" }
            );
        }
        Commands::Give {
            amount,
            category,
            currency,
            name,
        } => give(&client, amount, &category, &currency, name).await?,
        Commands::Buy { ebook_id, email } => buy(&client, &ebook_id, &email).await?,
        Commands::Pray {
            message,
            name,
            email,
            private,
        } => {
            let mut page = PrayerPage::new();
            let form = page.form_mut();
            form.message = message;
            form.name = name.unwrap_or_default();
            form.email = email.unwrap_or_default();
            form.is_private = private;
            if !page.submit(&client.gateway()).await {
                bail!(page.error().unwrap_or_default().to_string());
            }
            println!("Request received. Our prayer team is standing with you.");
        }
        Commands::Login { email, password } => {
            let mut login = AdminLogin::new();
            login.email = email;
            login.password = password;
            match login.submit(client.auth()).await {
                Some(route) => println!("Signed in, continue at {}", route),
                None => bail!(login.error().unwrap_or_default().to_string()),
            }
        }
        Commands::Logout => {
            let route = admin::logout(client.auth()).await;
            println!("Signed out, back to {}", route);
        }
        Commands::Dashboard => dashboard(&client).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glorious_church=info".into()),
        )
        .init();

    run().await
}
