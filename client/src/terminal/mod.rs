//! Interactive terminal front end.
//!
//! Signs a user in against the local credential store, then runs one chat
//! screen until the user logs out or quits. Output goes to stdout; logs go
//! to stderr.

pub mod commands;
pub mod render;

pub use commands::{Command, CommandError};

use crate::ai::AiGateway;
use crate::chat::{ChatEvent, ChatScreen};
use crate::config::AppConfig;
use anyhow::Context;
use glasschat_accounts::{
    AccountError, BackgroundStore, CredentialStore, Profile, SignupForm, PREDEFINED_BACKGROUNDS,
};
use glasschat_messaging::{Directory, User, UserId, REACTION_PALETTE};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info};

type Input = Lines<BufReader<Stdin>>;

enum Exit {
    Logout,
    Quit,
}

/// Runs the client until the user quits or stdin closes.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let credentials = CredentialStore::open(&config.data_dir);
    let backgrounds = BackgroundStore::open(&config.data_dir);
    // One gateway for the process; every chat screen gets its own session.
    let gateway = AiGateway::new(config.ai_settings());
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    info!(data_dir = %config.data_dir.display(), "GlassChat started");
    loop {
        let Some(profile) = authenticate(&credentials, &mut input).await? else {
            return Ok(());
        };
        match chat(&config, &gateway, &backgrounds, &profile, &mut input).await? {
            Exit::Logout => info!(email = %profile.email, "signed out"),
            Exit::Quit => return Ok(()),
        }
    }
}

async fn prompt(input: &mut Input, label: &str) -> anyhow::Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}

/// Login/signup loop. `None` means the user quit.
async fn authenticate(
    credentials: &CredentialStore,
    input: &mut Input,
) -> anyhow::Result<Option<Profile>> {
    println!("Welcome to GlassChat");
    loop {
        let Some(choice) = prompt(input, "[l]ogin, [s]ign up or [q]uit: ").await? else {
            return Ok(None);
        };
        let result = match choice.to_lowercase().as_str() {
            "l" | "login" => login(credentials, input).await?,
            "s" | "signup" | "sign up" => signup(credentials, input).await?,
            "q" | "quit" => return Ok(None),
            _ => continue,
        };
        match result {
            Some(Ok(profile)) => return Ok(Some(profile)),
            Some(Err(err)) if err.is_validation() => println!("{err}"),
            Some(Err(err)) => return Err(err).context("credential store failed"),
            None => return Ok(None),
        }
    }
}

async fn login(
    credentials: &CredentialStore,
    input: &mut Input,
) -> anyhow::Result<Option<Result<Profile, AccountError>>> {
    let Some(email) = prompt(input, "Email: ").await? else {
        return Ok(None);
    };
    let Some(password) = prompt(input, "Password: ").await? else {
        return Ok(None);
    };
    Ok(Some(credentials.login(&email, &password)))
}

async fn signup(
    credentials: &CredentialStore,
    input: &mut Input,
) -> anyhow::Result<Option<Result<Profile, AccountError>>> {
    let mut fields = Vec::with_capacity(4);
    for label in ["Name: ", "Email: ", "Password: ", "Confirm password: "] {
        match prompt(input, label).await? {
            Some(value) => fields.push(value),
            None => return Ok(None),
        }
    }
    let [name, email, password, confirm_password]: [String; 4] = fields
        .try_into()
        .map_err(|_| anyhow::anyhow!("signup form incomplete"))?;
    let form = SignupForm {
        name,
        email,
        password,
        confirm_password,
    };
    Ok(Some(credentials.signup(&form)))
}

async fn chat(
    config: &AppConfig,
    gateway: &AiGateway,
    backgrounds: &BackgroundStore,
    profile: &Profile,
    input: &mut Input,
) -> anyhow::Result<Exit> {
    let (mut screen, mut events) = ChatScreen::mount(
        config.chat_config(),
        Directory::builtin(),
        User::signed_in(&profile.name),
        gateway,
    )?;

    println!("Signed in as {}. {}", profile.name, screen.ai_status());
    println!("Background: {}", short_background(&backgrounds.load()));
    println!("Type /help for commands.\n");
    show_conversation(&screen).await;

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else {
                    return Ok(Exit::Quit);
                };
                match Command::parse(&line) {
                    Ok(Some(command)) => {
                        if let Some(exit) = dispatch(&mut screen, backgrounds, profile, command).await? {
                            return Ok(exit);
                        }
                    }
                    Ok(None) => {}
                    Err(err) => println!("{err}"),
                }
            }
            Some(event) = events.recv() => show_event(&screen, event).await,
        }
    }
}

async fn dispatch(
    screen: &mut ChatScreen,
    backgrounds: &BackgroundStore,
    profile: &Profile,
    command: Command,
) -> anyhow::Result<Option<Exit>> {
    match command {
        Command::Send(text) => {
            if let Err(err) = screen.send_message(&text).await {
                println!("{err}");
            }
        }
        Command::Contacts => {
            println!(
                "{}",
                render::contact_list(screen.contacts(), screen.active_contact().id())
            );
        }
        Command::Search(query) => {
            let hits = screen.search_contacts(&query);
            if hits.is_empty() {
                println!("no contacts match \"{query}\"");
            } else {
                println!(
                    "{}",
                    render::contact_list(hits, screen.active_contact().id())
                );
            }
        }
        Command::Open(id) => {
            if let Err(err) = screen.select_contact(&UserId::new(id)).await {
                println!("{err}");
            }
        }
        Command::React { index, emoji } => {
            if !REACTION_PALETTE.contains(&emoji.as_str()) {
                println!("pick one of {}", REACTION_PALETTE.join(" "));
                return Ok(None);
            }
            let target = screen
                .active_conversation()
                .await
                .and_then(|c| c.messages.get(index - 1).map(|m| m.id.clone()));
            match target {
                Some(message_id) => {
                    screen.open_reaction_picker(message_id.clone());
                    screen.react_to_message(&message_id, &emoji).await;
                }
                None => println!("no message [{index}] in this chat"),
            }
        }
        Command::Clear => {
            let id = screen.active_contact().id().clone();
            screen.clear_chat(&id).await;
        }
        Command::Backgrounds => {
            let current = backgrounds.load();
            for (id, url) in PREDEFINED_BACKGROUNDS {
                let marker = if url == current { '*' } else { ' ' };
                println!("{marker} {id}");
            }
            if current.starts_with("data:") {
                println!("* custom upload");
            }
        }
        Command::SelectBackground(id) => report_background(backgrounds.select(&id))?,
        Command::UploadBackground(path) => report_background(backgrounds.upload(&path))?,
        Command::Profile => {
            screen.set_profile_open(true);
            println!("{}", render::profile(screen.current_user(), &profile.email));
            screen.set_profile_open(false);
        }
        Command::Logout => return Ok(Some(Exit::Logout)),
        Command::Quit => return Ok(Some(Exit::Quit)),
        Command::Help => println!("{}", commands::HELP),
    }
    Ok(None)
}

fn report_background(result: Result<String, AccountError>) -> anyhow::Result<()> {
    match result {
        Ok(background) => println!("Background: {}", short_background(&background)),
        Err(AccountError::Io(err)) => println!("could not read image: {err}"),
        Err(err) if err.is_validation() => println!("{err}"),
        Err(err) => return Err(err).context("failed to save background"),
    }
    Ok(())
}

fn short_background(background: &str) -> &str {
    match background.split_once(',') {
        Some((header, _)) if background.starts_with("data:") => header,
        _ => background,
    }
}

async fn show_conversation(screen: &ChatScreen) {
    let conversation = screen.active_conversation().await;
    println!(
        "{}",
        render::conversation(
            screen.active_contact(),
            conversation.as_deref(),
            screen.current_user()
        )
    );
}

async fn show_event(screen: &ChatScreen, event: ChatEvent) {
    let active = screen.active_contact();
    match event {
        ChatEvent::MessageAppended {
            contact_id,
            message,
        } if &contact_id == active.id() => {
            let index = screen
                .active_conversation()
                .await
                .and_then(|c| c.messages.iter().position(|m| m.id == message.id))
                .map_or(0, |i| i + 1);
            println!(
                "{}",
                render::message_line(index, &message, active, &screen.current_user().id)
            );
        }
        ChatEvent::MessageAppended { contact_id, message } => {
            if message.sender_id == contact_id {
                let name = screen
                    .contacts()
                    .iter()
                    .find(|c| c.id() == &contact_id)
                    .map_or(contact_id.as_str(), |c| c.name());
                println!("(new message from {name})");
            }
        }
        ChatEvent::TypingChanged { contact_id, typing } => {
            if typing && &contact_id == active.id() {
                println!("{} is typing...", active.name());
            }
        }
        ChatEvent::ReactionsChanged {
            contact_id,
            message_id,
        } if &contact_id == active.id() => {
            if let Some(conversation) = screen.active_conversation().await {
                if let Some(i) = conversation.messages.iter().position(|m| m.id == message_id) {
                    let line = render::message_line(
                        i + 1,
                        &conversation.messages[i],
                        active,
                        &screen.current_user().id,
                    );
                    println!("{line}");
                }
            }
        }
        ChatEvent::ChatCleared { contact_id } if &contact_id == active.id() => {
            println!("Chat cleared.");
            show_conversation(screen).await;
        }
        ChatEvent::ContactSelected { .. } => show_conversation(screen).await,
        other => debug!(?other, "event not shown"),
    }
}
